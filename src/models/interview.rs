use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const INTERVIEW_STATUS_STARTED: &str = "started";
pub const INTERVIEW_STATUS_COMPLETED: &str = "completed";
pub const INTERVIEW_STATUS_EXPIRED: &str = "expired";

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Interview {
    pub id: String,
    pub owner: Option<String>,
    pub transcript: Option<String>,
    pub analysis: Option<String>,
    pub status: String,
    pub room_name: String,
    pub audio_signed_url: Option<String>,
    pub video_signed_url: Option<String>,
    /// Set when starting the interview took a purchased credit; only those
    /// are handed back when the session is abandoned.
    pub credit_consumed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Agent-reported results; JSON columns are serialized to text before storage.
#[derive(Debug, Clone, Default)]
pub struct InterviewResults {
    pub transcript: Option<String>,
    pub analysis: Option<String>,
    pub audio_signed_url: Option<String>,
    pub video_signed_url: Option<String>,
}

/// Columns stored as JSON text are parsed on read; anything that is not valid
/// JSON is surfaced as a plain string instead of failing the request.
pub fn parse_json_column(raw: Option<&str>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_json_column;
    use serde_json::json;

    #[test]
    fn json_columns_parse_or_fall_back_to_text() {
        assert_eq!(parse_json_column(None), serde_json::Value::Null);
        assert_eq!(
            parse_json_column(Some(r#"[{"role":"agent","text":"hi"}]"#)),
            json!([{"role": "agent", "text": "hi"}])
        );
        assert_eq!(parse_json_column(Some("not json")), json!("not json"));
    }
}
