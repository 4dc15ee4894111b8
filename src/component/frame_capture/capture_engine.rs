use super::media_source::{StreamFacts, MediaSource};
use super::retry_policy::{RetryOutcome, RetryPolicy};
use crate::tools::{ensure_directory_exists, is_non_empty_file};
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use image::{DynamicImage, ImageFormat};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 串流無法直接取得長度時，在提示長度後額外保留的緩衝（秒）
pub const DEFAULT_DURATION_BUFFER: f64 = 60.0;

/// 已儲存的畫面
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// 在請求列表中的位置
    pub index: usize,
    /// 目標時間點（秒）
    pub timestamp: f64,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl CapturedFrame {
    /// 取整後的秒數，用於檔名與備註查詢
    #[must_use]
    pub fn second(&self) -> u64 {
        self.timestamp.max(0.0).floor() as u64
    }
}

/// 擷取進度事件：每個索引一次，最後再送出 `(total, total)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProgress {
    pub index: usize,
    pub total: usize,
}

impl CaptureProgress {
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.index == self.total
    }

    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.index as f64 / self.total as f64
    }
}

/// 單一時間點的處理結果
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Captured { attempts: u32 },
    /// 輸出檔案已存在，直接沿用
    Reused,
    BeyondDuration { duration: f64 },
    Exhausted { attempts: u32, last_error: Option<String> },
}

#[derive(Debug, Default)]
pub struct CaptureReport {
    /// 成功的畫面，依處理順序排列（尚未依時間排序）
    pub frames: Vec<CapturedFrame>,
    /// 與輸入時間點一一對應
    pub outcomes: Vec<CaptureOutcome>,
    pub duration_seconds: f64,
}

impl CaptureReport {
    #[must_use]
    pub fn captured_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CaptureOutcome::BeyondDuration { .. }))
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CaptureOutcome::Exhausted { .. }))
            .count()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|f| f.path.clone()).collect()
    }
}

/// 無法繼續擷取的錯誤；單一時間點的失敗不會產生此錯誤
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("無法建立截圖資料夾 {path}: {reason}")]
    OutputDirectory { path: PathBuf, reason: String },
    #[error("無法取得影片長度 {location}: {reason}")]
    DurationUnknown { location: String, reason: String },
}

/// 畫面擷取引擎
///
/// 依序處理每個時間點：同一個媒體來源不能同時 seek，
/// 因此不做平行處理
pub struct FrameCaptureEngine {
    policy: RetryPolicy,
    duration_buffer: f64,
}

impl Default for FrameCaptureEngine {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), DEFAULT_DURATION_BUFFER)
    }
}

impl FrameCaptureEngine {
    #[must_use]
    pub const fn new(policy: RetryPolicy, duration_buffer: f64) -> Self {
        Self {
            policy,
            duration_buffer,
        }
    }

    /// 擷取所有時間點的畫面
    ///
    /// # Arguments
    /// * `source` - 媒體來源
    /// * `timestamps` - 目標時間點（秒），可重複
    /// * `output_dir` - 畫面輸出資料夾；已存在的非空檔案會直接沿用
    /// * `duration_hint` - 外部解析器回報的影片長度
    /// * `progress` - 進度事件接收端
    ///
    /// # Returns
    /// 部分時間點失敗仍回傳 `Ok`；只有無法建立資料夾或無法探測影片時回傳錯誤
    pub fn capture(
        &self,
        source: &dyn MediaSource,
        timestamps: &[f64],
        output_dir: &Path,
        duration_hint: Option<f64>,
        progress: Option<&Sender<CaptureProgress>>,
    ) -> Result<CaptureReport, CaptureError> {
        ensure_directory_exists(output_dir).map_err(|e| CaptureError::OutputDirectory {
            path: output_dir.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

        debug!("檢查影片長度: {}", source.location());
        let facts = source
            .inspect()
            .map_err(|e| CaptureError::DurationUnknown {
                location: source.location().to_string(),
                reason: format!("{e:#}"),
            })?;

        let duration = authoritative_duration(
            &facts,
            source.location().is_local(),
            duration_hint,
            timestamps,
            self.duration_buffer,
        );

        let total = timestamps.len();
        info!("開始擷取 {total} 個時間點，影片長度 {duration:.1}s");

        let mut report = CaptureReport {
            frames: Vec::with_capacity(total),
            outcomes: Vec::with_capacity(total),
            duration_seconds: duration,
        };

        for (index, &timestamp) in timestamps.iter().enumerate() {
            let outcome = self.capture_one(source, index, timestamp, duration, output_dir);

            match outcome {
                Ok((outcome, Some(frame))) => {
                    report.frames.push(frame);
                    report.outcomes.push(outcome);
                }
                Ok((outcome, None)) => report.outcomes.push(outcome),
                Err(outcome) => report.outcomes.push(outcome),
            }

            send_progress(progress, index, total);
        }

        send_progress(progress, total, total);

        info!(
            "擷取完成 - 成功: {}, 超出長度: {}, 失敗: {}",
            report.captured_count(),
            report.skipped_count(),
            report.failed_count()
        );

        Ok(report)
    }

    fn capture_one(
        &self,
        source: &dyn MediaSource,
        index: usize,
        timestamp: f64,
        duration: f64,
        output_dir: &Path,
    ) -> Result<(CaptureOutcome, Option<CapturedFrame>), CaptureOutcome> {
        if !timestamp.is_finite() || timestamp > duration {
            warn!("跳過時間點 {timestamp}s：超出影片長度 {duration:.1}s");
            return Ok((CaptureOutcome::BeyondDuration { duration }, None));
        }

        let path = output_dir.join(frame_file_name(index, timestamp));

        if let Some(frame) = reuse_existing(index, timestamp, &path) {
            debug!("時間點 {timestamp}s 的畫面已存在，沿用: {}", path.display());
            return Ok((CaptureOutcome::Reused, Some(frame)));
        }

        debug!("擷取時間點 {timestamp}s");
        let label = format!("擷取 {timestamp}s");
        let outcome = self.policy.run(&label, |_| {
            let mut reader = source.open()?;
            reader.seek(timestamp * 1000.0)?;
            let Some(frame) = reader.read_frame()? else {
                return Ok(None);
            };
            persist_frame(&frame, &path)?;
            Ok(Some((frame.width(), frame.height())))
        });

        match outcome {
            RetryOutcome::Succeeded {
                value: (width, height),
                attempts,
            } => Ok((
                CaptureOutcome::Captured { attempts },
                Some(CapturedFrame {
                    index,
                    timestamp,
                    path,
                    width,
                    height,
                }),
            )),
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                warn!("時間點 {timestamp}s 擷取失敗，已嘗試 {attempts} 次");
                Err(CaptureOutcome::Exhausted {
                    attempts,
                    last_error,
                })
            }
        }
    }
}

/// 輸出檔名：`screenshot_{index:03}_{秒數}s.png`
#[must_use]
pub fn frame_file_name(index: usize, timestamp: f64) -> String {
    let second = timestamp.max(0.0).floor() as u64;
    format!("screenshot_{index:03}_{second}s.png")
}

/// 決定用來驗證時間點的影片長度
///
/// * 本機檔案：幀數 / 幀率
/// * 其次：直接探測到的長度
/// * 其次：外部提示長度 + 緩衝
/// * 最後：最大時間點 + 緩衝
#[must_use]
pub fn authoritative_duration(
    facts: &StreamFacts,
    is_local: bool,
    duration_hint: Option<f64>,
    timestamps: &[f64],
    buffer: f64,
) -> f64 {
    if is_local {
        if let (Some(frames), Some(fps)) = (facts.frame_count, facts.frame_rate) {
            if frames > 0 && fps > 0.0 {
                return frames as f64 / fps;
            }
        }
    }

    if let Some(duration) = facts.duration_seconds.filter(|d| d.is_finite() && *d > 0.0) {
        return duration;
    }

    if let Some(hint) = duration_hint.filter(|d| d.is_finite() && *d > 0.0) {
        return hint + buffer;
    }

    let max_timestamp = timestamps
        .iter()
        .copied()
        .filter(|t| t.is_finite())
        .fold(0.0_f64, f64::max);
    if max_timestamp > 0.0 {
        return max_timestamp + buffer;
    }

    0.0
}

fn reuse_existing(index: usize, timestamp: f64, path: &Path) -> Option<CapturedFrame> {
    if !is_non_empty_file(path) {
        return None;
    }

    match image::image_dimensions(path) {
        Ok((width, height)) => Some(CapturedFrame {
            index,
            timestamp,
            path: path.to_path_buf(),
            width,
            height,
        }),
        Err(e) => {
            warn!("既有畫面無法讀取，重新擷取 {}: {e}", path.display());
            let _ = fs::remove_file(path);
            None
        }
    }
}

/// 先寫入暫存檔再改名，避免半成品被當作已擷取的畫面
fn persist_frame(frame: &DynamicImage, path: &Path) -> Result<()> {
    let partial = path.with_extension("png.part");

    let result = frame
        .save_with_format(&partial, ImageFormat::Png)
        .with_context(|| format!("無法寫入畫面: {}", partial.display()))
        .and_then(|()| {
            if is_non_empty_file(&partial) {
                Ok(())
            } else {
                anyhow::bail!("畫面檔案為空: {}", partial.display())
            }
        })
        .and_then(|()| {
            fs::rename(&partial, path)
                .with_context(|| format!("無法移動畫面到 {}", path.display()))
        });

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn send_progress(progress: Option<&Sender<CaptureProgress>>, index: usize, total: usize) {
    if let Some(sender) = progress {
        if sender.send(CaptureProgress { index, total }).is_err() {
            debug!("進度接收端已關閉");
        }
    }
}
