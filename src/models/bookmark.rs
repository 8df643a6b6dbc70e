use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkCreate {
    pub question_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_json: Option<JsonValue>,
}

impl BookmarkCreate {
    pub fn new(question_text: impl Into<String>) -> Self {
        Self {
            question_text: question_text.into(),
            question_source: None,
            metadata_json: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.question_source = Some(source.into());
        self
    }
}

/// 收藏的题目
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub question_text: String,
    #[serde(default)]
    pub question_source: Option<String>,
    #[serde(default)]
    pub metadata_json: Option<JsonValue>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

// 后端可能返回不带时区的时间，按 UTC 处理
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_created_at_accepts_naive_and_offset_times() {
        let naive: Bookmark = serde_json::from_str(
            r#"{"id":1,"user_id":7,"question_text":"2x+5=11","created_at":"2024-05-01T10:00:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(naive.created_at.hour(), 10);

        let offset: Bookmark = serde_json::from_str(
            r#"{"id":2,"user_id":7,"question_text":"x^2=4","created_at":"2024-05-01T10:00:00+02:00"}"#,
        )
        .unwrap();
        assert_eq!(offset.created_at.hour(), 8);
    }
}
