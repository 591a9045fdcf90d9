//! Request types for the Attendance Engine API.
//!
//! Instants must be RFC 3339 strings carrying an explicit offset
//! (`2026-01-15T09:00:00+05:00` or `...Z`); naive timestamps are rejected
//! during deserialization.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::DeviceState;

/// Normalizes an optional wire instant to UTC.
pub(crate) fn to_utc(instant: Option<DateTime<FixedOffset>>) -> Option<DateTime<Utc>> {
    instant.map(|i| i.with_timezone(&Utc))
}

/// Parses a `YYYY-MM-DD` path segment.
pub(crate) fn parse_date(field: &str, raw: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        EngineError::validation(field, format!("'{}' is not a YYYY-MM-DD date", raw))
    })
}

/// Query string of `GET /shift-window/:emp_code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftWindowQuery {
    /// The instant to resolve; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<FixedOffset>>,
}

/// Request body for `POST /attendance/reconcile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// The business date to reconcile.
    pub date: NaiveDate,
}

/// Request body for `POST /punches`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunchRequest {
    /// The employee code on the badge.
    pub emp_code: String,
    /// When the badge was swiped.
    pub event_time: DateTime<FixedOffset>,
}

/// Request body for `POST /breaks/open`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenBreakRequest {
    /// The employee code.
    pub emp_code: String,
    /// Category text; the break opens as `Pending` when omitted.
    #[serde(default)]
    pub category: Option<String>,
    /// Free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Start instant; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<FixedOffset>>,
}

/// Request body for `PATCH /breaks/category`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBreakCategoryRequest {
    /// The employee code.
    pub emp_code: String,
    /// The new category text.
    pub category: String,
    /// Free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for `POST /breaks/close`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseBreakRequest {
    /// The employee code.
    pub emp_code: String,
    /// End instant; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<FixedOffset>>,
}

/// Request body for `POST /agent/heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// Device identity.
    pub device_id: String,
    /// The employee the device is enrolled to.
    pub emp_code: String,
    /// State reported by the agent.
    pub state: DeviceState,
    /// Activity score, 0-100.
    #[serde(default)]
    pub activity_score: Option<i64>,
    /// Heartbeat instant; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<FixedOffset>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instants_require_an_offset() {
        let ok: Result<PunchRequest, _> = serde_json::from_str(
            r#"{"emp_code":"E-001","event_time":"2026-01-15T09:00:00+05:00"}"#,
        );
        assert_eq!(
            to_utc(Some(ok.unwrap().event_time)).unwrap().to_rfc3339(),
            "2026-01-15T04:00:00+00:00"
        );

        let naive: Result<PunchRequest, _> =
            serde_json::from_str(r#"{"emp_code":"E-001","event_time":"2026-01-15T09:00:00"}"#);
        assert!(naive.is_err());
    }

    #[test]
    fn test_optional_fields_default() {
        let request: OpenBreakRequest = serde_json::from_str(r#"{"emp_code":"E-001"}"#).unwrap();
        assert!(request.category.is_none());
        assert!(request.at.is_none());
    }

    #[test]
    fn test_heartbeat_state_wire_format() {
        let request: HeartbeatRequest = serde_json::from_str(
            r#"{"device_id":"dev-1","emp_code":"E-001","state":"IDLE"}"#,
        )
        .unwrap();
        assert_eq!(request.state, DeviceState::Idle);
        assert!(request.activity_score.is_none());
    }

    #[test]
    fn test_parse_date_reports_field() {
        assert!(parse_date("date", "2026-01-15").is_ok());
        let err = parse_date("date", "15/01/2026").unwrap_err();
        assert!(err.to_string().contains("'date'"));
    }
}
