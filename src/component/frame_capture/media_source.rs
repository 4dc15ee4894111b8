//! 媒體來源抽象
//!
//! 擷取引擎只透過 [`MediaSource`] / [`FrameReader`] 操作影片，
//! 正式環境使用 ffmpeg，測試可替換為假來源

use crate::tools::inspect_media;
use anyhow::{Context, Result, bail};
use image::{DynamicImage, ImageFormat};
use log::debug;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// 兩段式 seek 的前置緩衝時間（秒）
const SEEK_MARGIN: f64 = 2.0;

/// 影片位置：完整下載的本機檔案或遠端串流
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocation {
    LocalFile(PathBuf),
    Remote(String),
}

impl MediaLocation {
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::LocalFile(_))
    }

    /// 傳給 ffmpeg `-i` 的輸入字串
    #[must_use]
    pub fn as_input(&self) -> String {
        match self {
            Self::LocalFile(path) => path.to_string_lossy().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

impl fmt::Display for MediaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFile(path) => write!(f, "{}", path.display()),
            // 串流 URL 通常帶有很長的簽章參數，只顯示主機與路徑
            Self::Remote(url) => f.write_str(url.split('?').next().unwrap_or(url)),
        }
    }
}

/// 直接探測媒體得到的資訊
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamFacts {
    pub frame_count: Option<u64>,
    pub frame_rate: Option<f64>,
    pub duration_seconds: Option<f64>,
}

pub trait MediaSource: Send + Sync {
    fn location(&self) -> &MediaLocation;

    /// 探測影片長度資訊；失敗代表來源完全無法開啟
    fn inspect(&self) -> Result<StreamFacts>;

    /// 開啟一次讀取工作階段；每次擷取都會重新開啟
    fn open(&self) -> Result<Box<dyn FrameReader + '_>>;
}

pub trait FrameReader {
    fn seek(&mut self, position_ms: f64) -> Result<()>;

    /// 讀取目前位置的畫面；`None` 表示該位置沒有可讀的畫面
    fn read_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// 依位置建立媒體來源，讓排程層不直接依賴 ffmpeg
pub trait MediaSourceFactory: Send + Sync {
    fn create(&self, location: &MediaLocation) -> Box<dyn MediaSource>;
}

/// 以 ffprobe / ffmpeg 實作的媒體來源
pub struct FfmpegSource {
    location: MediaLocation,
    network_timeout: Duration,
}

impl FfmpegSource {
    #[must_use]
    pub const fn new(location: MediaLocation, network_timeout: Duration) -> Self {
        Self {
            location,
            network_timeout,
        }
    }

    fn remote_timeout(&self) -> Option<Duration> {
        (!self.location.is_local()).then_some(self.network_timeout)
    }
}

impl MediaSource for FfmpegSource {
    fn location(&self) -> &MediaLocation {
        &self.location
    }

    fn inspect(&self) -> Result<StreamFacts> {
        let info = inspect_media(&self.location.as_input(), self.remote_timeout())?;
        Ok(StreamFacts {
            frame_count: info.frame_count,
            frame_rate: info.frame_rate,
            duration_seconds: info.duration_seconds,
        })
    }

    fn open(&self) -> Result<Box<dyn FrameReader + '_>> {
        if let MediaLocation::LocalFile(path) = &self.location {
            if !path.is_file() {
                bail!("影片檔案不存在: {}", path.display());
            }
        }

        Ok(Box::new(FfmpegFrameReader {
            source: self,
            position_seconds: 0.0,
        }))
    }
}

struct FfmpegFrameReader<'a> {
    source: &'a FfmpegSource,
    position_seconds: f64,
}

impl FrameReader for FfmpegFrameReader<'_> {
    fn seek(&mut self, position_ms: f64) -> Result<()> {
        if !position_ms.is_finite() || position_ms < 0.0 {
            bail!("無效的 seek 位置: {position_ms}ms");
        }
        self.position_seconds = position_ms / 1000.0;
        Ok(())
    }

    /// 兩段式 seek：
    /// 1. `-ss` 在 `-i` 前：快速跳轉到最近的關鍵幀
    /// 2. `-ss` 在 `-i` 後：精準解碼到目標時間點
    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        let t0 = (self.position_seconds - SEEK_MARGIN).max(0.0);
        let delta = self.position_seconds - t0;

        debug!(
            "擷取畫面: position={:.2}s, seek={:.2}s+{:.2}s",
            self.position_seconds, t0, delta
        );

        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        if let Some(timeout) = self.source.remote_timeout() {
            args.push("-rw_timeout".to_string());
            args.push(timeout.as_micros().to_string());
        }

        if t0 > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{t0:.3}"));
        }

        args.push("-i".to_string());
        args.push(self.source.location.as_input());

        if delta > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{delta:.3}"));
        }

        args.extend(
            [
                "-frames:v",
                "1",
                "-an",
                "-sn",
                "-dn",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ]
            .map(String::from),
        );

        let output = Command::new("ffmpeg")
            .args(&args)
            .output()
            .with_context(|| format!("無法執行 ffmpeg 擷取畫面: {}", self.source.location))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg 擷取畫面失敗: {}", stderr.trim());
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }

        let frame = image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
            .context("無法解碼 ffmpeg 輸出的畫面")?;
        Ok(Some(frame))
    }
}

/// 建立 [`FfmpegSource`] 的工廠
#[derive(Debug, Clone, Copy)]
pub struct FfmpegSourceFactory {
    pub network_timeout: Duration,
}

impl MediaSourceFactory for FfmpegSourceFactory {
    fn create(&self, location: &MediaLocation) -> Box<dyn MediaSource> {
        Box::new(FfmpegSource::new(location.clone(), self.network_timeout))
    }
}
