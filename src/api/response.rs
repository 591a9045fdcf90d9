//! Response types for the Attendance Engine API.
//!
//! This module defines the error body, the mapping from [`EngineError`] to
//! HTTP statuses, and the views that render instants in the configured
//! offset.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::{LocalOffset, ShiftWindow, ViolationFlags};
use crate::engine::{HeartbeatOutcome, ReconcileFailure, ReconcileReport};
use crate::error::EngineError;
use crate::models::{AttendanceRecord, AttendanceStatus, BreakCategory, BreakInterval, DeviceState, PunchEvent};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        let (status, error) = match error {
            EngineError::EmployeeNotFound { .. } => {
                (StatusCode::NOT_FOUND, ApiError::new("EMPLOYEE_NOT_FOUND", message))
            }
            EngineError::ShiftNotFound { .. } => {
                (StatusCode::NOT_FOUND, ApiError::new("SHIFT_NOT_FOUND", message))
            }
            EngineError::NoShiftConfigured { .. } => (
                StatusCode::NOT_FOUND,
                ApiError::with_details(
                    "NO_SHIFT_CONFIGURED",
                    message,
                    "Assign a shift to the employee before resolving shift windows",
                ),
            ),
            EngineError::NoOpenBreak { .. } => {
                (StatusCode::NOT_FOUND, ApiError::new("NO_OPEN_BREAK", message))
            }
            EngineError::InvalidBreakCategory { .. } => (
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "INVALID_BREAK_CATEGORY",
                    message,
                    "Expected one of Official, General, Namaz",
                ),
            ),
            EngineError::Validation { .. } => {
                (StatusCode::BAD_REQUEST, ApiError::validation_error(message))
            }
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            ),
            EngineError::Storage { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("STORAGE_ERROR", "Storage error", message),
            ),
        };
        ApiErrorResponse { status, error }
    }
}

/// A resolved shift occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftWindowView {
    /// The shift code.
    pub shift_code: String,
    /// The business date the occurrence belongs to.
    pub attendance_date: NaiveDate,
    /// Occurrence start.
    pub shift_start: DateTime<FixedOffset>,
    /// Occurrence end.
    pub shift_end: DateTime<FixedOffset>,
    /// Start widened by the grace period.
    pub grace_start: DateTime<FixedOffset>,
    /// End widened by the grace period.
    pub grace_end: DateTime<FixedOffset>,
    /// The grace period.
    pub grace_period_minutes: i64,
}

impl ShiftWindowView {
    /// Renders a window in `offset`.
    pub fn render(window: &ShiftWindow, offset: LocalOffset) -> Self {
        Self {
            shift_code: window.shift_code.clone(),
            attendance_date: window.attendance_date,
            shift_start: offset.render(window.shift_start),
            shift_end: offset.render(window.shift_end),
            grace_start: offset.render(window.grace_start()),
            grace_end: offset.render(window.grace_end()),
            grace_period_minutes: window.grace_period_minutes,
        }
    }
}

/// An attendance record with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecordView {
    /// The business date.
    pub business_date: NaiveDate,
    /// The employee code.
    pub emp_code: String,
    /// The shift code.
    pub shift_code: String,
    /// Derived or overridden status.
    pub status: AttendanceStatus,
    /// Resolved check-in.
    pub check_in: Option<DateTime<FixedOffset>>,
    /// Resolved checkout.
    pub check_out: Option<DateTime<FixedOffset>>,
    /// Punch count, never below the resolved endpoints.
    pub punch_count: u32,
    /// Late and early-leave flags.
    pub violations: ViolationFlags,
    /// HR excuse.
    pub excused: bool,
}

impl AttendanceRecordView {
    /// Renders a record in `offset`.
    pub fn render(record: &AttendanceRecord, offset: LocalOffset) -> Self {
        Self {
            business_date: record.business_date,
            emp_code: record.emp_code.clone(),
            shift_code: record.shift_code.clone(),
            status: record.attendance_status(),
            check_in: record.check_in.map(|i| offset.render(i)),
            check_out: record.check_out.map(|i| offset.render(i)),
            punch_count: record.total_punches(),
            violations: ViolationFlags {
                late: record.late,
                early_leave: record.early_leave,
                late_minutes: record.late_minutes,
                early_minutes: record.early_minutes,
            },
            excused: record.excused,
        }
    }
}

/// Response of `POST /attendance/reconcile`.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    /// The business date.
    pub business_date: NaiveDate,
    /// Records written.
    pub written: usize,
    /// Writes that failed.
    pub failures: Vec<ReconcileFailure>,
    /// Every employee's record, absent ones included.
    pub records: Vec<AttendanceRecordView>,
}

impl ReconcileResponse {
    /// Renders a report in `offset`.
    pub fn render(report: &ReconcileReport, offset: LocalOffset) -> Self {
        Self {
            business_date: report.business_date,
            written: report.written,
            failures: report.failures.clone(),
            records: report
                .records
                .iter()
                .map(|r| AttendanceRecordView::render(r, offset))
                .collect(),
        }
    }
}

/// Response of `GET /attendance/:date/:emp_code/violations`.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationsResponse {
    /// The employee code.
    pub emp_code: String,
    /// The business date.
    pub business_date: NaiveDate,
    /// The shift the flags were computed against.
    pub shift_code: String,
    /// Derived or overridden status.
    pub status: AttendanceStatus,
    /// The flags.
    pub flags: ViolationFlags,
}

/// A break interval.
#[derive(Debug, Clone, Serialize)]
pub struct BreakView {
    /// Break id.
    pub id: Uuid,
    /// The employee code.
    pub emp_code: String,
    /// The business date of the owning shift occurrence.
    pub business_date: NaiveDate,
    /// The owning shift code.
    pub shift_code: String,
    /// Break category.
    pub category: BreakCategory,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Start.
    pub started_at: DateTime<FixedOffset>,
    /// End, if closed.
    pub ended_at: Option<DateTime<FixedOffset>>,
    /// Rounded minutes, if closed.
    pub duration_minutes: Option<i64>,
    /// Allowance; `null` is unbounded.
    pub allowed_minutes: Option<i64>,
    /// Minutes over the allowance.
    pub exceeded_minutes: i64,
}

impl BreakView {
    /// Renders a break in `offset`.
    pub fn render(interval: &BreakInterval, offset: LocalOffset) -> Self {
        Self {
            id: interval.id,
            emp_code: interval.emp_code.clone(),
            business_date: interval.business_date,
            shift_code: interval.shift_code.clone(),
            category: interval.category,
            reason: interval.reason.clone(),
            started_at: offset.render(interval.started_at),
            ended_at: interval.ended_at.map(|i| offset.render(i)),
            duration_minutes: interval.duration_minutes,
            allowed_minutes: interval.allowed_minutes,
            exceeded_minutes: interval.exceeded_minutes,
        }
    }
}

/// Response of `POST /breaks/open`.
#[derive(Debug, Clone, Serialize)]
pub struct BreakOpenedResponse {
    /// The new break.
    pub opened: BreakView,
    /// The break closed to make room for it.
    pub force_closed: Option<BreakView>,
}

/// Response of `POST /breaks/close`.
#[derive(Debug, Clone, Serialize)]
pub struct BreakClosedResponse {
    /// The closed break; `null` when nothing was open.
    pub closed: Option<BreakView>,
}

/// Response of `POST /breaks/sweep`.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Breaks closed by the sweep.
    pub closed: Vec<BreakView>,
}

/// Response of `POST /punches`.
#[derive(Debug, Clone, Serialize)]
pub struct PunchView {
    /// The employee code.
    pub emp_code: String,
    /// The swipe instant.
    pub event_time: DateTime<FixedOffset>,
}

impl PunchView {
    /// Renders a punch in `offset`.
    pub fn render(event: &PunchEvent, offset: LocalOffset) -> Self {
        Self {
            emp_code: event.emp_code.clone(),
            event_time: offset.render(event.event_time),
        }
    }
}

/// Response of `POST /agent/heartbeat`.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatResponse {
    /// Device identity.
    pub device_id: String,
    /// The employee code.
    pub emp_code: String,
    /// Derived state.
    pub state: DeviceState,
    /// Consecutive suspicious heartbeats.
    pub consecutive_suspicious: u32,
    /// Sticky review flag.
    pub flagged: bool,
    /// Heartbeat instant.
    pub last_seen_at: Option<DateTime<FixedOffset>>,
    /// Owning shift occurrence; `null` without a shift.
    pub shift_window: Option<ShiftWindowView>,
}

impl HeartbeatResponse {
    /// Renders an outcome in `offset`.
    pub fn render(outcome: &HeartbeatOutcome, offset: LocalOffset) -> Self {
        Self {
            device_id: outcome.session.device_id.clone(),
            emp_code: outcome.session.emp_code.clone(),
            state: outcome.state,
            consecutive_suspicious: outcome.session.consecutive_suspicious,
            flagged: outcome.session.flagged,
            last_seen_at: outcome.session.last_seen_at.map(|i| offset.render(i)),
            shift_window: outcome
                .shift_window
                .as_ref()
                .map(|w| ShiftWindowView::render(w, offset)),
        }
    }
}
