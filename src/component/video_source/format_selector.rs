use serde::Deserialize;

/// 串流畫質上限
pub const MAX_STREAM_HEIGHT: u32 = 1080;

/// yt-dlp `formats` 陣列中的單一格式
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatInfo {
    pub format_id: Option<String>,
    pub url: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub height: Option<u32>,
}

impl FormatInfo {
    fn height_or_zero(&self) -> u32 {
        self.height.unwrap_or(0)
    }

    fn is_h264_mp4(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|codec| codec.contains("avc"))
            && self.ext.as_deref() == Some("mp4")
    }
}

/// 選出最適合直接讀取的格式
///
/// 1. H.264 mp4 且不超過 1080p，取最高畫質
/// 2. 任何不超過 1080p 的格式，取最高畫質
/// 3. 第一個格式
///
/// 只考慮有 URL 的格式；同畫質時保留先出現者
#[must_use]
pub fn select_best_format(formats: &[FormatInfo]) -> Option<&FormatInfo> {
    let candidates: Vec<&FormatInfo> = formats.iter().filter(|f| f.url.is_some()).collect();

    highest(
        candidates
            .iter()
            .copied()
            .filter(|f| f.is_h264_mp4() && f.height_or_zero() <= MAX_STREAM_HEIGHT),
    )
    .or_else(|| {
        highest(
            candidates
                .iter()
                .copied()
                .filter(|f| f.height_or_zero() <= MAX_STREAM_HEIGHT),
        )
    })
    .or_else(|| candidates.first().copied())
}

fn highest<'a>(formats: impl Iterator<Item = &'a FormatInfo>) -> Option<&'a FormatInfo> {
    formats.fold(None, |best: Option<&FormatInfo>, format| match best {
        Some(current) if current.height_or_zero() >= format.height_or_zero() => Some(current),
        _ => Some(format),
    })
}
