use super::job_store::{JobStatus, JobStatusView, JobStore};
use super::reporter::JobReporter;
use super::request::{CapturePlan, JobRequest, SubmitError, ValidatedRequest, resolve_entries};
use super::scratch::ScratchDir;
use crate::component::frame_capture::{
    CaptureError, FfmpegSourceFactory, FrameCaptureEngine, MediaSourceFactory,
};
use crate::component::page_layout::{
    LayoutError, NoteMap, PageLayoutComposer, PageRenderer, PdfRenderer, output_file_name,
};
use crate::component::video_source::{ResolvedVideo, VideoSourceResolver, YtDlpResolver};
use crate::config::UserSettings;
use crate::tools::{DEFAULT_FALLBACK_INTERVAL, generate_interval_timestamps};
use log::{error, info, warn};
use rust_i18n::t;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// 使工作失敗的錯誤
#[derive(Debug, Error)]
pub enum JobFailure {
    #[error("無法取得影片來源: {reason}")]
    Resolve { reason: String },
    #[error("無法建立截圖暫存資料夾: {reason}")]
    Scratch { reason: String },
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("沒有成功擷取任何截圖")]
    NoFrames,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl JobFailure {
    /// 顯示給使用者的固定訊息
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Resolve { .. } => t!("job.failed_resolve").to_string(),
            Self::Scratch { .. } | Self::Capture(_) | Self::NoFrames => {
                t!("job.failed_capture").to_string()
            }
            Self::Layout(_) => t!("job.failed_document").to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetrieveError {
    #[error("不合法的檔案名稱: {0}")]
    InvalidName(String),
    #[error("找不到檔案: {0}")]
    NotFound(String),
}

/// 工作排程器：解析影片、擷取畫面、產生 PDF
///
/// 每個工作在自己的執行緒執行，狀態寫入共用的 [`JobStore`]
#[derive(Clone)]
pub struct JobOrchestrator {
    settings: Arc<UserSettings>,
    store: Arc<JobStore>,
    resolver: Arc<dyn VideoSourceResolver>,
    sources: Arc<dyn MediaSourceFactory>,
    renderer: Arc<dyn PageRenderer>,
}

impl JobOrchestrator {
    pub fn new(
        settings: UserSettings,
        store: Arc<JobStore>,
        resolver: Arc<dyn VideoSourceResolver>,
        sources: Arc<dyn MediaSourceFactory>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            resolver,
            sources,
            renderer,
        }
    }

    /// 使用 yt-dlp、ffmpeg 與 printpdf 的正式設定
    #[must_use]
    pub fn from_settings(settings: &UserSettings, store: Arc<JobStore>) -> Self {
        Self::new(
            settings.clone(),
            store,
            Arc::new(YtDlpResolver::from_settings(settings)),
            Arc::new(FfmpegSourceFactory {
                network_timeout: settings.socket_timeout(),
            }),
            Arc::new(PdfRenderer),
        )
    }

    #[must_use]
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// 驗證並在背景執行緒啟動工作，立即回傳工作 id
    pub fn submit(&self, request: &JobRequest) -> Result<String, SubmitError> {
        let validated = request.validate()?;
        let job_id = self.store.create();

        let orchestrator = self.clone();
        let reporter = JobReporter::new(Arc::clone(&self.store), job_id.clone());
        let spawned = thread::Builder::new()
            .name(format!("job-{job_id}"))
            .spawn(move || orchestrator.run(&reporter, &validated));

        if let Err(e) = spawned {
            error!("無法啟動工作執行緒 {job_id}: {e}");
            self.store.update(&job_id, |job| {
                job.status = JobStatus::Failed;
                job.message = e.to_string();
            });
            return Err(SubmitError::Spawn(e.to_string()));
        }

        info!("已提交工作 {job_id}");
        Ok(job_id)
    }

    #[must_use]
    pub fn poll(&self, job_id: &str) -> Option<JobStatusView> {
        self.store.view(job_id)
    }

    /// 取得完成的 PDF 路徑，並在保留時間後刪除
    pub fn retrieve(&self, filename: &str) -> Result<PathBuf, RetrieveError> {
        if !is_plain_file_name(filename) || !is_document_name(filename) {
            return Err(RetrieveError::InvalidName(filename.to_string()));
        }

        let path = self.settings.output_dir.join(filename);
        if !path.is_file() {
            return Err(RetrieveError::NotFound(filename.to_string()));
        }

        schedule_deletion(path.clone(), self.settings.retention_after_retrieval());
        Ok(path)
    }

    fn run(&self, reporter: &JobReporter, request: &ValidatedRequest) {
        let _panic_guard = PanicGuard { reporter };
        match self.execute(reporter, request) {
            Ok((path, filename)) => {
                info!("工作 {} 完成: {}", reporter.job_id(), path.display());
                reporter.complete(&t!("job.completed"), path, filename);
            }
            Err(failure) => {
                error!("工作 {} 失敗: {failure}", reporter.job_id());
                reporter.fail(&failure.user_message());
            }
        }
    }

    fn execute(
        &self,
        reporter: &JobReporter,
        request: &ValidatedRequest,
    ) -> Result<(PathBuf, String), JobFailure> {
        let settings = &self.settings;
        let band = settings.capture_band();

        reporter.stage(
            JobStatus::Processing,
            &t!("job.resolving"),
            5.0,
            "Analyzing video and preparing for capture",
        );

        let ResolvedVideo {
            location,
            title,
            duration_seconds,
            temp_media,
        } = self
            .resolver
            .resolve(&request.video_ref)
            .map_err(|e| JobFailure::Resolve {
                reason: format!("{e:#}"),
            })?;
        // 下載模式的暫存影片在工作結束時刪除
        let _media_guard = temp_media;

        let duration = duration_seconds.unwrap_or(0.0);
        reporter.stage(
            JobStatus::Processing,
            &t!("job.preparing"),
            15.0,
            &format!("Video title: {title}, Duration: {duration} seconds"),
        );

        let plan = plan_timestamps(&request.plan, duration);
        reporter.progress(15.0, &plan.describe(&title));
        let TimestampPlan {
            timestamps, notes, ..
        } = plan;

        let scratch = ScratchDir::create(&settings.scratch_root, reporter.job_id())
            .map_err(|e| JobFailure::Scratch {
                reason: format!("{e:#}"),
            })?;

        reporter.stage(
            JobStatus::Processing,
            &t!("job.capturing"),
            band.0 * 100.0,
            &format!("Capturing {} screenshots", timestamps.len()),
        );

        let engine = FrameCaptureEngine::new(
            settings.retry_policy(),
            settings.duration_buffer_seconds,
        );
        let source = self.sources.create(&location);
        let (sender, receiver) = crossbeam_channel::unbounded();

        let report = thread::scope(|scope| {
            scope.spawn(|| {
                for event in &receiver {
                    reporter.capture_progress(event, band);
                }
            });

            let result = engine.capture(
                source.as_ref(),
                &timestamps,
                scratch.path(),
                duration_seconds,
                Some(&sender),
            );
            drop(sender);
            result
        })?;

        if report.frames.is_empty() {
            return Err(JobFailure::NoFrames);
        }

        let generating = band.1 * 100.0;
        reporter.stage(
            JobStatus::GeneratingDocument,
            &t!("job.generating"),
            generating,
            &format!("Combining {} screenshots into PDF", report.frames.len()),
        );

        let filename = output_file_name(&title, reporter.job_id());
        let output_path = settings.output_dir.join(&filename);

        reporter.progress(
            generating.max(80.0),
            "Generating PDF with timestamps and notes",
        );
        let composer = PageLayoutComposer::new(Arc::clone(&self.renderer));
        let document = composer.compose(&report.frames, &title, &notes, &output_path)?;

        reporter.progress(95.0, "Cleaning up temporary files");
        drop(scratch);

        Ok((document.path, filename))
    }
}

/// 工作執行緒 panic 時把工作標記為失敗，避免狀態停在處理中
struct PanicGuard<'a> {
    reporter: &'a JobReporter,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("工作 {} 的執行緒意外中止", self.reporter.job_id());
            self.reporter.fail(&t!("job.failed_unexpected"));
        }
    }
}

/// 本次工作要擷取的時間點
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampPlan {
    pub timestamps: Vec<f64>,
    pub notes: NoteMap,
    /// 自訂時間點無法使用，改用預設間隔
    pub fell_back: bool,
}

impl TimestampPlan {
    /// 寫入工作 `detail` 的說明
    #[must_use]
    pub fn describe(&self, title: &str) -> String {
        if self.fell_back {
            format!(
                "Video title: {title}, Using default intervals ({DEFAULT_FALLBACK_INTERVAL}s) as custom timestamps failed"
            )
        } else {
            format!(
                "Video title: {title}, Using {} timestamps",
                self.timestamps.len()
            )
        }
    }
}

/// 依擷取方式產生時間點；自訂列表解析後為空時改用 60 秒間隔
#[must_use]
pub fn plan_timestamps(plan: &CapturePlan, duration: f64) -> TimestampPlan {
    match plan {
        CapturePlan::Interval { seconds } => TimestampPlan {
            timestamps: generate_interval_timestamps(duration, *seconds),
            notes: NoteMap::new(),
            fell_back: false,
        },
        CapturePlan::Custom { entries } => {
            let (timestamps, notes) = resolve_entries(entries);
            if timestamps.is_empty() {
                warn!("沒有可用的自訂時間點，改用每 {DEFAULT_FALLBACK_INTERVAL} 秒截圖");
                TimestampPlan {
                    timestamps: generate_interval_timestamps(duration, DEFAULT_FALLBACK_INTERVAL),
                    notes,
                    fell_back: true,
                }
            } else {
                TimestampPlan {
                    timestamps,
                    notes,
                    fell_back: false,
                }
            }
        }
    }
}

/// 只接受單純檔名，拒絕任何路徑成分
fn is_plain_file_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && filename != ".."
        && Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename)
}

/// 只提供完成的 PDF；產生中的 `.pdf.part` 與其他檔案不開放
fn is_document_name(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn schedule_deletion(path: PathBuf, delay: Duration) {
    let spawned = thread::Builder::new()
        .name("artifact-expiry".to_string())
        .spawn(move || {
            thread::sleep(delay);
            if path.exists() {
                match fs::remove_file(&path) {
                    Ok(()) => info!("已刪除過期 PDF: {}", path.display()),
                    Err(e) => warn!("無法刪除 PDF {}: {e}", path.display()),
                }
            }
        });

    if let Err(e) = spawned {
        warn!("無法排程刪除 PDF: {e}");
    }
}
