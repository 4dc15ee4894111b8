use super::job_store::{JobStatus, JobStore};
use crate::component::frame_capture::CaptureProgress;
use std::path::PathBuf;
use std::sync::Arc;

/// 單一工作的狀態回報器，由工作執行緒持有
pub struct JobReporter {
    store: Arc<JobStore>,
    job_id: String,
}

impl JobReporter {
    #[must_use]
    pub const fn new(store: Arc<JobStore>, job_id: String) -> Self {
        Self { store, job_id }
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// 進入新階段
    pub fn stage(&self, status: JobStatus, message: &str, percent: f64, detail: &str) {
        self.store.update(&self.job_id, |job| {
            job.status = status;
            job.message = message.to_string();
            job.progress = job.progress.max(percent);
            job.detail = detail.to_string();
        });
    }

    /// 同一階段內的進度更新
    pub fn progress(&self, percent: f64, detail: &str) {
        self.store.update(&self.job_id, |job| {
            job.progress = job.progress.max(percent);
            job.detail = detail.to_string();
        });
    }

    /// 把擷取進度映射到 `band`（0 到 1）區間
    pub fn capture_progress(&self, event: CaptureProgress, band: (f64, f64)) {
        if event.total == 0 {
            return;
        }
        let (start, end) = band;
        let fraction = event.fraction();
        let percent = (start + (end - start) * fraction) * 100.0;
        let detail = format!(
            "Capturing screenshot {} of {} ({}%)",
            event.index,
            event.total,
            (fraction * 100.0).floor()
        );
        self.progress(percent, &detail);
    }

    pub fn complete(&self, message: &str, path: PathBuf, filename: String) {
        let detail = format!("PDF created successfully: {filename}");
        self.store.update(&self.job_id, |job| {
            job.status = JobStatus::Completed;
            job.message = message.to_string();
            job.progress = 100.0;
            job.detail = detail;
            job.result_path = Some(path);
            job.result_filename = Some(filename);
        });
    }

    /// 標記失敗，`detail` 保留最後嘗試的步驟
    pub fn fail(&self, message: &str) {
        self.store.update(&self.job_id, |job| {
            let last_step = if job.detail.is_empty() {
                "Unknown step".to_string()
            } else {
                job.detail.clone()
            };
            job.status = JobStatus::Failed;
            job.message = message.to_string();
            job.detail = format!("Failed at step: {last_step}");
        });
    }
}
