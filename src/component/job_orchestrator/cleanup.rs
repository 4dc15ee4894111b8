use super::job_store::JobStore;
use crate::component::video_source::is_media_in_use;
use crate::config::UserSettings;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// 關閉訊號的檢查間隔
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_documents: usize,
    pub removed_downloads: usize,
    pub evicted_jobs: usize,
}

/// 定期清理過期 PDF、下載殘留與已結束的工作
pub struct CleanupSweeper {
    output_dir: PathBuf,
    download_dir: PathBuf,
    max_age: Duration,
    job_ttl: Duration,
    interval: Duration,
    store: Arc<JobStore>,
}

impl CleanupSweeper {
    #[must_use]
    pub fn from_settings(settings: &UserSettings, store: Arc<JobStore>) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            download_dir: settings.download_dir.clone(),
            max_age: settings.artifact_max_age(),
            job_ttl: settings.finished_job_ttl(),
            interval: settings.sweep_interval(),
            store,
        }
    }

    /// 執行一次清理
    ///
    /// `purge_all_downloads` 為 true 時刪除所有下載檔（啟動時使用），
    /// 否則只刪除超過保存期限的下載檔；執行中工作持有的影片一律保留
    pub fn sweep(&self, purge_all_downloads: bool) -> SweepReport {
        let removed_documents = remove_stale_files(&self.output_dir, Some(self.max_age), |path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf") || ext == "part")
        });

        let download_age = (!purge_all_downloads).then_some(self.max_age);
        let removed_downloads = remove_stale_files(&self.download_dir, download_age, |path| {
            if is_media_in_use(path) {
                debug!("影片仍在使用中，略過: {}", path.display());
                return false;
            }
            true
        });

        let evicted_jobs = self.store.evict_finished(self.job_ttl);

        let report = SweepReport {
            removed_documents,
            removed_downloads,
            evicted_jobs,
        };
        info!(
            "清理完成 - PDF: {}, 下載檔: {}, 工作: {}",
            report.removed_documents, report.removed_downloads, report.evicted_jobs
        );
        report
    }

    /// 啟動背景清理：先完整清理一次，之後每隔設定時間清理
    pub fn spawn(self, shutdown_signal: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("cleanup-sweeper".to_string())
            .spawn(move || {
                self.sweep(true);
                let mut last_sweep = Instant::now();

                while !shutdown_signal.load(Ordering::SeqCst) {
                    thread::sleep(SHUTDOWN_CHECK_INTERVAL);
                    if last_sweep.elapsed() >= self.interval {
                        self.sweep(false);
                        last_sweep = Instant::now();
                    }
                }
                debug!("清理執行緒結束");
            })
    }
}

/// 刪除資料夾第一層中符合條件且超過 `max_age` 的檔案；`None` 表示全部刪除
fn remove_stale_files<F>(dir: &Path, max_age: Option<Duration>, matches: F) -> usize
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let path = entry.path();
        if !matches(path) {
            continue;
        }

        let expired = max_age.is_none_or(|max_age| {
            entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= max_age)
        });
        if !expired {
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                debug!("已刪除: {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("無法刪除 {}: {e}", path.display()),
        }
    }
    removed
}
