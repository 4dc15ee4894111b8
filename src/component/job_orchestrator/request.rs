use crate::component::page_layout::NoteMap;
use crate::tools::{TimestampToken, resolve_batch};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 間隔模式允許的最小間隔（秒）
pub const MIN_INTERVAL_SECONDS: u64 = 5;

/// 未指定間隔時使用的值（秒）
pub const DEFAULT_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Interval,
    Custom,
}

/// 工作提交內容
///
/// `timestamp_list` 可以是 JSON 陣列，或是內容為 JSON 陣列的字串
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(alias = "youtube_url")]
    pub video_ref: String,
    #[serde(default)]
    pub mode: CaptureMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_list: Option<Value>,
}

/// 自訂時間點列表中的一個項目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampEntry {
    Annotated {
        timestamp: TimestampToken,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Bare(TimestampToken),
}

impl TimestampEntry {
    #[must_use]
    pub const fn token(&self) -> &TimestampToken {
        match self {
            Self::Annotated { timestamp, .. } | Self::Bare(timestamp) => timestamp,
        }
    }

    #[must_use]
    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Annotated { note, .. } => note.as_deref(),
            Self::Bare(_) => None,
        }
    }

    fn from_value(item: Value) -> Self {
        serde_json::from_value(item.clone()).unwrap_or_else(|_| {
            warn!("無法辨識的時間點項目: {item}");
            Self::Bare(TimestampToken::Text(item.to_string()))
        })
    }
}

impl From<&str> for TimestampEntry {
    fn from(value: &str) -> Self {
        Self::Bare(TimestampToken::from(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("缺少影片網址")]
    MissingVideoRef,
    #[error("間隔至少需要 {minimum} 秒，收到 {interval} 秒")]
    IntervalTooSmall { interval: u64, minimum: u64 },
    #[error("自訂模式需要時間點列表")]
    MissingTimestamps,
    #[error("時間點列表不是有效的 JSON: {0}")]
    InvalidJson(String),
    #[error("時間點物件格式已停用，請改用 [{{\"timestamp\": ..., \"note\": ...}}] 列表")]
    DeprecatedFormat,
    #[error("時間點列表必須是陣列")]
    InvalidFormat,
    #[error("無法啟動工作執行緒: {0}")]
    Spawn(String),
}

/// 驗證後的擷取方式
#[derive(Debug, Clone, PartialEq)]
pub enum CapturePlan {
    Interval { seconds: u64 },
    Custom { entries: Vec<TimestampEntry> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub video_ref: String,
    pub plan: CapturePlan,
}

impl JobRequest {
    #[must_use]
    pub fn interval(video_ref: impl Into<String>, seconds: u64) -> Self {
        Self {
            video_ref: video_ref.into(),
            mode: CaptureMode::Interval,
            interval: Some(seconds),
            timestamp_list: None,
        }
    }

    #[must_use]
    pub fn custom(video_ref: impl Into<String>, entries: &[TimestampEntry]) -> Self {
        let items = entries
            .iter()
            .map(|entry| match entry {
                TimestampEntry::Bare(token) => token_value(token),
                TimestampEntry::Annotated { timestamp, note } => {
                    let mut object = serde_json::Map::new();
                    object.insert("timestamp".to_string(), token_value(timestamp));
                    if let Some(note) = note {
                        object.insert("note".to_string(), Value::String(note.clone()));
                    }
                    Value::Object(object)
                }
            })
            .collect();

        Self {
            video_ref: video_ref.into(),
            mode: CaptureMode::Custom,
            interval: None,
            timestamp_list: Some(Value::Array(items)),
        }
    }

    /// 檢查提交內容並轉為可執行的計畫
    pub fn validate(&self) -> Result<ValidatedRequest, SubmitError> {
        let video_ref = self.video_ref.trim();
        if video_ref.is_empty() {
            return Err(SubmitError::MissingVideoRef);
        }

        let plan = match self.mode {
            CaptureMode::Interval => {
                let seconds = self.interval.unwrap_or(DEFAULT_INTERVAL_SECONDS);
                if seconds < MIN_INTERVAL_SECONDS {
                    return Err(SubmitError::IntervalTooSmall {
                        interval: seconds,
                        minimum: MIN_INTERVAL_SECONDS,
                    });
                }
                CapturePlan::Interval { seconds }
            }
            CaptureMode::Custom => {
                let entries = parse_timestamp_list(self.timestamp_list.as_ref())?;
                CapturePlan::Custom { entries }
            }
        };

        Ok(ValidatedRequest {
            video_ref: video_ref.to_string(),
            plan,
        })
    }
}

fn token_value(token: &TimestampToken) -> Value {
    match token {
        TimestampToken::Seconds(value) => {
            serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number)
        }
        TimestampToken::Text(text) => Value::String(text.clone()),
    }
}

/// 解析自訂時間點列表；只接受陣列
pub fn parse_timestamp_list(raw: Option<&Value>) -> Result<Vec<TimestampEntry>, SubmitError> {
    let value = match raw {
        None | Some(Value::Null) => return Err(SubmitError::MissingTimestamps),
        Some(Value::String(text)) if text.trim().is_empty() => {
            return Err(SubmitError::MissingTimestamps);
        }
        Some(Value::String(text)) => serde_json::from_str::<Value>(text)
            .map_err(|e| SubmitError::InvalidJson(e.to_string()))?,
        Some(other) => other.clone(),
    };

    match value {
        Value::Array(items) if items.is_empty() => Err(SubmitError::MissingTimestamps),
        Value::Array(items) => Ok(items.into_iter().map(TimestampEntry::from_value).collect()),
        Value::Object(_) => Err(SubmitError::DeprecatedFormat),
        _ => Err(SubmitError::InvalidFormat),
    }
}

/// 解析所有時間點，並依解析後的整數秒整理備註
#[must_use]
pub fn resolve_entries(entries: &[TimestampEntry]) -> (Vec<f64>, NoteMap) {
    let tokens: Vec<TimestampToken> = entries.iter().map(|e| e.token().clone()).collect();
    let timestamps = resolve_batch(&tokens);

    let mut notes = NoteMap::new();
    for (entry, seconds) in entries.iter().zip(&timestamps) {
        if let Some(note) = entry.note() {
            notes.insert(seconds.max(0.0).floor() as u64, note);
        }
    }
    (timestamps, notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interval_validation() {
        let ok = JobRequest::interval("https://youtu.be/x", 5).validate().unwrap();
        assert_eq!(ok.plan, CapturePlan::Interval { seconds: 5 });

        let too_small = JobRequest::interval("https://youtu.be/x", 4).validate();
        assert_eq!(
            too_small,
            Err(SubmitError::IntervalTooSmall {
                interval: 4,
                minimum: 5
            })
        );
    }

    #[test]
    fn test_interval_defaults_to_sixty() {
        let request: JobRequest =
            serde_json::from_value(json!({"youtube_url": "https://youtu.be/x"})).unwrap();
        let validated = request.validate().unwrap();
        assert_eq!(validated.plan, CapturePlan::Interval { seconds: 60 });
    }

    #[test]
    fn test_missing_video_ref() {
        assert_eq!(
            JobRequest::interval("   ", 60).validate(),
            Err(SubmitError::MissingVideoRef)
        );
    }

    #[test]
    fn test_custom_requires_list() {
        let mut request = JobRequest::custom("v", &[]);
        assert_eq!(request.validate(), Err(SubmitError::MissingTimestamps));

        request.timestamp_list = None;
        assert_eq!(request.validate(), Err(SubmitError::MissingTimestamps));
    }

    #[test]
    fn test_custom_accepts_encoded_string() {
        let request: JobRequest = serde_json::from_value(json!({
            "video_ref": "v",
            "mode": "custom",
            "timestamp_list": "[\"0:30\", {\"timestamp\": \"2:00\", \"note\": \"demo\"}, 45]"
        }))
        .unwrap();

        let CapturePlan::Custom { entries } = request.validate().unwrap().plan else {
            panic!("expected custom plan");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].note(), Some("demo"));
        assert_eq!(entries[2].token(), &TimestampToken::Seconds(45.0));
    }

    #[test]
    fn test_legacy_object_shapes_rejected() {
        let flat = JobRequest {
            video_ref: "v".to_string(),
            mode: CaptureMode::Custom,
            interval: None,
            timestamp_list: Some(json!({"1:30": "note"})),
        };
        assert_eq!(flat.validate(), Err(SubmitError::DeprecatedFormat));

        let nested = JobRequest {
            timestamp_list: Some(json!({"abc": {"timestamps": {"63": "x"}}})),
            ..flat
        };
        assert_eq!(nested.validate(), Err(SubmitError::DeprecatedFormat));
    }

    #[test]
    fn test_invalid_json_and_shape() {
        let bad_json = JobRequest {
            video_ref: "v".to_string(),
            mode: CaptureMode::Custom,
            interval: None,
            timestamp_list: Some(json!("[1, 2")),
        };
        assert!(matches!(bad_json.validate(), Err(SubmitError::InvalidJson(_))));

        let scalar = JobRequest {
            timestamp_list: Some(json!(42)),
            ..bad_json
        };
        assert_eq!(scalar.validate(), Err(SubmitError::InvalidFormat));
    }

    #[test]
    fn test_resolve_entries_with_malformed_tokens() {
        let entries = parse_timestamp_list(Some(&json!(["0:30", "bad", "2:00", true]))).unwrap();
        let (timestamps, notes) = resolve_entries(&entries);

        assert_eq!(timestamps, vec![30.0, 0.0, 120.0, 0.0]);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_resolve_entries_keys_notes_by_second() {
        let entries = vec![
            TimestampEntry::Annotated {
                timestamp: TimestampToken::from("1:30.7"),
                note: Some("intro".to_string()),
            },
            TimestampEntry::from("2:00"),
        ];
        let (timestamps, notes) = resolve_entries(&entries);

        assert!((timestamps[0] - 90.7).abs() < 1e-9);
        assert_eq!(notes.note_for(90), Some("intro"));
        assert_eq!(notes.note_for(120), None);
    }

    #[test]
    fn test_custom_builder_round_trips_entries() {
        let entries = vec![
            TimestampEntry::from("0:30"),
            TimestampEntry::Annotated {
                timestamp: TimestampToken::Seconds(75.0),
                note: Some("n".to_string()),
            },
        ];
        let request = JobRequest::custom("v", &entries);
        let CapturePlan::Custom { entries: parsed } = request.validate().unwrap().plan else {
            panic!("expected custom plan");
        };
        assert_eq!(parsed, entries);
    }
}
