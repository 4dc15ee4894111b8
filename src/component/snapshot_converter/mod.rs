//! 互動式轉換元件
//!
//! 詢問影片與時間點後提交工作，並顯示進度

mod main;

pub use main::{ConversionKind, SnapshotConverter, parse_timestamp_input};
