//! 工作排程元件
//!
//! 依序執行：解析影片 → 產生時間點 → 擷取畫面 → 產生 PDF，
//! 並透過 [`JobStore`] 提供狀態查詢

mod cleanup;
mod job_store;
mod main;
mod reporter;
mod request;
mod scratch;

pub use cleanup::{CleanupSweeper, SweepReport};
pub use job_store::{Job, JobStatus, JobStatusView, JobStore};
pub use main::{JobFailure, JobOrchestrator, RetrieveError, TimestampPlan, plan_timestamps};
pub use reporter::JobReporter;
pub use request::{
    CaptureMode, CapturePlan, DEFAULT_INTERVAL_SECONDS, JobRequest, MIN_INTERVAL_SECONDS,
    SubmitError, TimestampEntry, ValidatedRequest, parse_timestamp_list, resolve_entries,
};
pub use scratch::ScratchDir;
