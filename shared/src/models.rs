//! Shared data models.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed key of the single calendar record.
pub const RECORD_ID: &str = "main";

/// The stored calendar row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub settings: Value,
    pub calendar_data: Value,
    pub updated_at: DateTime<Utc>,
}

impl CalendarRecord {
    /// Build a record stamped with the current time.
    pub fn new(settings: Value, calendar_data: Value) -> Self {
        Self {
            settings,
            calendar_data,
            updated_at: Utc::now(),
        }
    }
}

/// GET response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPayload {
    pub settings: Value,
    pub calendar_data: Value,
}

impl CalendarPayload {
    /// Payload served when no record exists yet.
    pub fn empty() -> Self {
        Self {
            settings: Value::Null,
            calendar_data: Value::Object(Default::default()),
        }
    }
}

impl From<CalendarRecord> for CalendarPayload {
    fn from(record: CalendarRecord) -> Self {
        let calendar_data = if is_falsy(&record.calendar_data) {
            Value::Object(Default::default())
        } else {
            record.calendar_data
        };

        Self {
            settings: record.settings,
            calendar_data,
        }
    }
}

/// POST request body. Missing fields are stored as `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub calendar_data: Value,
}

/// POST success body.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
}

/// PUT request body.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// PUT response body.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// JavaScript-style falsiness, which the admin UI relies on for `calendarData`.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Parse a stored `updated_at` value.
///
/// Accepts RFC 3339, Postgres text output (`2024-01-02 03:04:05.123+00`) and
/// timestamps without an offset, which are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(value, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|ts| ts.and_utc())
}
