use crate::component::frame_capture::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// 設定檔名稱（位於目前工作目錄）
pub const SETTINGS_FILE: &str = "settings.json";

/// 介面語言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    pub const ALL: [Self; 2] = [Self::EnUs, Self::ZhTw];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::EnUs => "English",
            Self::ZhTw => "繁體中文",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 影片取得方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// 直接讀取串流 URL
    #[default]
    Stream,
    /// 先完整下載到暫存資料夾
    Download,
}

impl ResolveMode {
    pub const ALL: [Self; 2] = [Self::Stream, Self::Download];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 使用者設定，缺少的欄位使用預設值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    /// 預設截圖間隔（秒）
    pub interval_seconds: u64,
    pub resolve_mode: ResolveMode,
    pub max_capture_attempts: u32,
    pub retry_backoff_ms: u64,
    /// 擷取階段在整體進度中的起點
    pub capture_band_start: f64,
    /// 擷取階段在整體進度中的終點
    pub capture_band_end: f64,
    pub duration_buffer_seconds: f64,
    pub socket_timeout_seconds: u64,
    pub output_dir: PathBuf,
    pub download_dir: PathBuf,
    /// 每個工作的截圖暫存資料夾建立在此之下
    pub scratch_root: PathBuf,
    /// 取走 PDF 後保留多久才刪除
    pub retention_after_retrieval_seconds: u64,
    pub artifact_max_age_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub finished_job_ttl_seconds: u64,
    pub poll_interval_ms: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            interval_seconds: 60,
            resolve_mode: ResolveMode::default(),
            max_capture_attempts: 3,
            retry_backoff_ms: 500,
            capture_band_start: 0.20,
            capture_band_end: 0.70,
            duration_buffer_seconds: 60.0,
            socket_timeout_seconds: 30,
            output_dir: PathBuf::from("PDF"),
            download_dir: PathBuf::from("temp_video_downloads"),
            scratch_root: PathBuf::from("."),
            retention_after_retrieval_seconds: 180,
            artifact_max_age_seconds: 3600,
            sweep_interval_seconds: 1800,
            finished_job_ttl_seconds: 3600,
            poll_interval_ms: 500,
        }
    }
}

impl UserSettings {
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_capture_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    /// 擷取階段的進度區間；設定不合理時回到預設值
    #[must_use]
    pub fn capture_band(&self) -> (f64, f64) {
        let (start, end) = (self.capture_band_start, self.capture_band_end);
        if start.is_finite() && end.is_finite() && 0.0 <= start && start <= end && end <= 1.0 {
            (start, end)
        } else {
            (0.20, 0.70)
        }
    }

    #[must_use]
    pub const fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_seconds)
    }

    #[must_use]
    pub const fn retention_after_retrieval(&self) -> Duration {
        Duration::from_secs(self.retention_after_retrieval_seconds)
    }

    #[must_use]
    pub const fn artifact_max_age(&self) -> Duration {
        Duration::from_secs(self.artifact_max_age_seconds)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    #[must_use]
    pub const fn finished_job_ttl(&self) -> Duration {
        Duration::from_secs(self.finished_job_ttl_seconds)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: UserSettings,
}
