//! 影片畫面擷取元件
//!
//! 依序處理每個時間點：
//! A. 探測影片長度
//! B. 跳過超出長度的時間點
//! C. 沿用已存在的畫面，否則有限次數重試擷取
//! D. 每個時間點送出一次進度事件

mod capture_engine;
mod media_source;
mod retry_policy;

pub use capture_engine::{
    CaptureError, CaptureOutcome, CaptureProgress, CaptureReport, CapturedFrame,
    DEFAULT_DURATION_BUFFER, FrameCaptureEngine, authoritative_duration, frame_file_name,
};
pub use media_source::{
    FfmpegSource, FfmpegSourceFactory, FrameReader, MediaLocation, StreamFacts, MediaSource,
    MediaSourceFactory,
};
pub use retry_policy::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, RetryOutcome, RetryPolicy};
