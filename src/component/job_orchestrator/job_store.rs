use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    GeneratingDocument,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// 工作的完整狀態，只由執行該工作的執行緒修改
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub message: String,
    /// 0 到 100
    pub progress: f64,
    pub detail: String,
    pub result_path: Option<PathBuf>,
    pub result_filename: Option<String>,
    pub created_at: Instant,
    pub finished_at: Option<Instant>,
}

impl Job {
    fn new(id: String) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            message: "Job queued".to_string(),
            progress: 0.0,
            detail: String::new(),
            result_path: None,
            result_filename: None,
            created_at: Instant::now(),
            finished_at: None,
        }
    }

    #[must_use]
    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            status: self.status,
            message: self.message.clone(),
            progress: (self.progress / 100.0).clamp(0.0, 1.0),
            detail: (!self.detail.is_empty()).then(|| self.detail.clone()),
            result_filename: if self.status == JobStatus::Completed {
                self.result_filename.clone()
            } else {
                None
            },
        }
    }
}

/// 查詢工作狀態時回傳的快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub message: String,
    /// 0 到 1
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_filename: Option<String>,
}

/// 以 id 索引的工作表
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 建立排隊中的工作並回傳 id
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.write().insert(id.clone(), Job::new(id.clone()));
        debug!("建立工作 {id}");
        id
    }

    /// 修改工作；已結束的工作不再接受修改
    pub fn update<F>(&self, id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.write();
        match jobs.get_mut(id) {
            Some(job) if !job.status.is_finished() => {
                apply(job);
                if job.status.is_finished() {
                    job.finished_at = Some(Instant::now());
                }
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Job> {
        self.read().get(id).cloned()
    }

    #[must_use]
    pub fn view(&self, id: &str) -> Option<JobStatusView> {
        self.read().get(id).map(Job::view)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 移除結束超過 `ttl` 的工作，回傳移除數量
    pub fn evict_finished(&self, ttl: Duration) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .is_none_or(|finished| finished.elapsed() < ttl)
        });
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_view() {
        let store = JobStore::new();
        let id = store.create();

        let view = store.view(&id).unwrap();
        assert_eq!(view.status, JobStatus::Queued);
        assert!(view.progress.abs() < f64::EPSILON);
        assert_eq!(view.detail, None);
        assert!(store.view("missing").is_none());
    }

    #[test]
    fn test_finished_job_is_frozen() {
        let store = JobStore::new();
        let id = store.create();

        assert!(store.update(&id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100.0;
            job.result_filename = Some("a.pdf".to_string());
        }));
        assert!(!store.update(&id, |job| job.status = JobStatus::Processing));

        let view = store.view(&id).unwrap();
        assert_eq!(view.status, JobStatus::Completed);
        assert!((view.progress - 1.0).abs() < f64::EPSILON);
        assert_eq!(view.result_filename.as_deref(), Some("a.pdf"));
        assert!(store.snapshot(&id).unwrap().finished_at.is_some());
    }

    #[test]
    fn test_result_filename_hidden_until_completed() {
        let store = JobStore::new();
        let id = store.create();
        store.update(&id, |job| {
            job.status = JobStatus::GeneratingDocument;
            job.result_filename = Some("a.pdf".to_string());
        });
        assert_eq!(store.view(&id).unwrap().result_filename, None);
    }

    #[test]
    fn test_evict_finished_only() {
        let store = JobStore::new();
        let running = store.create();
        let done = store.create();
        store.update(&done, |job| job.status = JobStatus::Failed);

        assert_eq!(store.evict_finished(Duration::from_secs(3600)), 0);
        assert_eq!(store.evict_finished(Duration::ZERO), 1);
        assert!(store.view(&running).is_some());
        assert!(store.view(&done).is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::GeneratingDocument).unwrap(),
            "\"generating_document\""
        );
    }
}
