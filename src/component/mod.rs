//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod frame_capture;
pub mod job_orchestrator;
pub mod page_layout;
pub mod snapshot_converter;
pub mod video_source;

pub use frame_capture::FrameCaptureEngine;
pub use job_orchestrator::{CleanupSweeper, JobOrchestrator, JobStore};
pub use page_layout::PageLayoutComposer;
pub use snapshot_converter::{ConversionKind, SnapshotConverter};
pub use video_source::YtDlpResolver;
