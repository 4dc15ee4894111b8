//! 時間點解析模組
//!
//! 將使用者輸入的 `H:MM:SS`、`MM:SS` 或純秒數轉換為秒數，
//! 以及依固定間隔產生時間點

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// 解析失敗時的替代值
pub const FALLBACK_SECONDS: f64 = 0.0;

/// 自訂時間點全部無效時改用的間隔（秒）
pub const DEFAULT_FALLBACK_INTERVAL: u64 = 60;

static REGEX_PLAIN_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("Invalid regex"));

/// 原始時間點輸入（字串或 JSON 數字）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampToken {
    Seconds(f64),
    Text(String),
}

impl fmt::Display for TimestampToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for TimestampToken {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampParseError {
    #[error("時間格式錯誤: {0}")]
    InvalidShape(String),
    #[error("時間欄位不是有效數字: {0}")]
    InvalidComponent(String),
}

/// 解析時間點；格式錯誤時記錄警告並回傳 0，不中斷整批處理
#[must_use]
pub fn parse_timestamp(token: &str) -> f64 {
    match try_parse_timestamp(token) {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!("無法解析時間點 '{}': {e}，改用 {FALLBACK_SECONDS}", token.trim());
            FALLBACK_SECONDS
        }
    }
}

/// 嚴格解析時間點
///
/// 支援格式：
/// * `95` 或 `95.5`：秒數
/// * `1:30`：分:秒（秒可為小數）
/// * `1:02:03`：時:分:秒（秒可為小數）
pub fn try_parse_timestamp(token: &str) -> Result<f64, TimestampParseError> {
    let token = token.trim();

    if REGEX_PLAIN_SECONDS.is_match(token) {
        return parse_seconds_component(token);
    }

    let parts: Vec<&str> = token.split(':').collect();
    match parts.as_slice() {
        [minutes, seconds] => {
            let minutes = parse_integer_component(minutes)?;
            let seconds = parse_seconds_component(seconds)?;
            Ok(minutes as f64 * 60.0 + seconds)
        }
        [hours, minutes, seconds] => {
            let hours = parse_integer_component(hours)?;
            let minutes = parse_integer_component(minutes)?;
            let seconds = parse_seconds_component(seconds)?;
            Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
        }
        _ => Err(TimestampParseError::InvalidShape(token.to_string())),
    }
}

fn parse_integer_component(part: &str) -> Result<u64, TimestampParseError> {
    part.trim()
        .parse::<u64>()
        .map_err(|_| TimestampParseError::InvalidComponent(part.to_string()))
}

fn parse_seconds_component(part: &str) -> Result<f64, TimestampParseError> {
    let value = part
        .trim()
        .parse::<f64>()
        .map_err(|_| TimestampParseError::InvalidComponent(part.to_string()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(TimestampParseError::InvalidComponent(part.to_string()));
    }
    Ok(value)
}

/// 解析單一原始時間點
#[must_use]
pub fn resolve_token(token: &TimestampToken) -> f64 {
    match token {
        TimestampToken::Text(text) => parse_timestamp(text),
        TimestampToken::Seconds(value) => parse_timestamp(&value.to_string()),
    }
}

/// 逐一解析整批時間點，保留輸入順序與重複值
///
/// 回傳空列表時，呼叫端應改用 [`DEFAULT_FALLBACK_INTERVAL`] 產生時間點
#[must_use]
pub fn resolve_batch(tokens: &[TimestampToken]) -> Vec<f64> {
    tokens.iter().map(resolve_token).collect()
}

/// 依固定間隔產生時間點：`0, interval, 2*interval, ...`，不超過 `floor(duration)`
#[must_use]
pub fn generate_interval_timestamps(duration: f64, interval: u64) -> Vec<f64> {
    if interval == 0 || !duration.is_finite() || duration <= 0.0 {
        return vec![0.0];
    }

    let last = duration.floor() as u64;
    (0..=last)
        .step_by(usize::try_from(interval).unwrap_or(usize::MAX))
        .map(|seconds| seconds as f64)
        .collect()
}

/// 格式化為 `H:MM:SS`
#[must_use]
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes_seconds() {
        assert!((parse_timestamp("1:30") - 90.0).abs() < f64::EPSILON);
        assert!((parse_timestamp("0:30") - 30.0).abs() < f64::EPSILON);
        assert!((parse_timestamp("2:00") - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert!((parse_timestamp("1:02:03") - 3723.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_plain_seconds() {
        assert!((parse_timestamp("45") - 45.0).abs() < f64::EPSILON);
        assert!((parse_timestamp(" 12.5 ") - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_fractional_seconds_component() {
        assert!((parse_timestamp("1:30.5") - 90.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_invalid_falls_back_to_zero() {
        assert!(parse_timestamp("bogus").abs() < f64::EPSILON);
        assert!(parse_timestamp("1:2:3:4").abs() < f64::EPSILON);
        assert!(parse_timestamp("a:30").abs() < f64::EPSILON);
        assert!(parse_timestamp("").abs() < f64::EPSILON);
        assert!(parse_timestamp("-5").abs() < f64::EPSILON);
    }

    #[test]
    fn test_try_parse_reports_shape() {
        assert_eq!(
            try_parse_timestamp("bogus"),
            Err(TimestampParseError::InvalidShape("bogus".to_string()))
        );
        assert!(matches!(
            try_parse_timestamp("1:xx"),
            Err(TimestampParseError::InvalidComponent(_))
        ));
    }

    #[test]
    fn test_resolve_batch_keeps_order_and_duplicates() {
        let tokens: Vec<TimestampToken> = vec!["0:30".into(), "bad".into(), "2:00".into()];
        assert_eq!(resolve_batch(&tokens), vec![30.0, 0.0, 120.0]);

        let dupes = vec![TimestampToken::Seconds(10.0), "10".into()];
        assert_eq!(resolve_batch(&dupes), vec![10.0, 10.0]);
    }

    #[test]
    fn test_resolve_numeric_token() {
        assert!((resolve_token(&TimestampToken::Seconds(63.0)) - 63.0).abs() < f64::EPSILON);
        assert!(resolve_token(&TimestampToken::Seconds(-3.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_generate_interval_timestamps() {
        assert_eq!(generate_interval_timestamps(125.0, 60), vec![0.0, 60.0, 120.0]);
        assert_eq!(
            generate_interval_timestamps(185.0, 60),
            vec![0.0, 60.0, 120.0, 180.0]
        );
        assert_eq!(generate_interval_timestamps(120.0, 60), vec![0.0, 60.0, 120.0]);
    }

    #[test]
    fn test_generate_interval_non_positive_duration() {
        assert_eq!(generate_interval_timestamps(0.0, 60), vec![0.0]);
        assert_eq!(generate_interval_timestamps(-10.0, 60), vec![0.0]);
        assert_eq!(generate_interval_timestamps(100.0, 0), vec![0.0]);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(90), "0:01:30");
        assert_eq!(format_hms(3723), "1:02:03");
        assert_eq!(format_hms(90_000), "25:00:00");
    }

    #[test]
    fn test_token_deserialize_untagged() {
        let tokens: Vec<TimestampToken> = serde_json::from_str(r#"["1:30", 45]"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                TimestampToken::Text("1:30".to_string()),
                TimestampToken::Seconds(45.0)
            ]
        );
    }
}
