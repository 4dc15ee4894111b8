use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;

/// ffprobe 取得的媒體資訊，遠端串流可能缺少部分欄位
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaInfo {
    pub duration_seconds: Option<f64>,
    pub frame_count: Option<u64>,
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得媒體資訊
///
/// `input` 可以是本機路徑或串流 URL；遠端來源會套用 `network_timeout`
pub fn inspect_media(input: &str, network_timeout: Option<Duration>) -> Result<MediaInfo> {
    let mut command = Command::new("ffprobe");
    command.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"]);

    if let Some(timeout) = network_timeout {
        command.args(["-rw_timeout", &timeout.as_micros().to_string()]);
    }

    let output = command
        .arg(input)
        .output()
        .with_context(|| format!("無法執行 ffprobe: {input}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 執行失敗: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_ffprobe_output(&stdout).with_context(|| format!("無法解析 ffprobe 輸出: {input}"))
}

fn parse_ffprobe_output(json: &str) -> Result<MediaInfo> {
    let facts: FfprobeOutput = serde_json::from_str(json)?;

    // 找到視訊串流
    let video_stream = facts
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| anyhow::anyhow!("找不到視訊串流"))?;

    // 影片長度優先取 format，其次取 stream
    let duration_seconds = facts
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let frame_rate = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .filter(|fps| *fps > 0.0);

    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0);

    Ok(MediaInfo {
        duration_seconds,
        frame_count,
        frame_rate,
        width: video_stream.width,
        height: video_stream.height,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!(parse_frame_rate("invalid").is_none());
        assert!(parse_frame_rate("30/0").is_none());
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_local_file_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "avg_frame_rate": "25/1", "r_frame_rate": "25/1", "nb_frames": "4625"}
            ],
            "format": {"duration": "185.000000"}
        }"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.frame_count, Some(4625));
        assert_eq!(info.width, Some(1920));
        assert!((info.frame_rate.unwrap() - 25.0).abs() < 0.01);
        assert!((info.duration_seconds.unwrap() - 185.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_stream_output_without_counts() {
        let json = r#"{
            "streams": [{"codec_type": "video", "avg_frame_rate": "0/0", "r_frame_rate": "30/1"}],
            "format": {"duration": "N/A"}
        }"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.frame_count, None);
        assert_eq!(info.duration_seconds, None);
        assert!((info.frame_rate.unwrap() - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_output_without_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(parse_ffprobe_output(json).is_err());
    }
}
