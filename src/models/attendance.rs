//! Daily attendance records.
//!
//! One logical record exists per employee per business date. `Present` and
//! `Absent` are never stored as facts: they are derived from the resolved
//! check-in and punch count every time they are read. HR can overlay a
//! non-derived status (holiday, leave, half day, work from home).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Attendance status of a business date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// At least one punch or a check-in was resolved.
    Present,
    /// Nothing was resolved for the date.
    Absent,
    /// Public or company holiday.
    Holiday,
    /// Approved paid leave.
    PaidLeave,
    /// Approved unpaid leave.
    UnpaidLeave,
    /// Half day, billed as half a deduction day.
    HalfDay,
    /// Approved work from home.
    WorkFromHome,
}

impl AttendanceStatus {
    /// Returns true for statuses HR sets explicitly rather than derived ones.
    pub fn is_override(&self) -> bool {
        !matches!(self, AttendanceStatus::Present | AttendanceStatus::Absent)
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Holiday => "Holiday",
            AttendanceStatus::PaidLeave => "Paid Leave",
            AttendanceStatus::UnpaidLeave => "Un-paid Leave",
            AttendanceStatus::HalfDay => "Half Day",
            AttendanceStatus::WorkFromHome => "WFH",
        };
        write!(f, "{}", label)
    }
}

/// The composite key of an attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// The business date the record is filed under.
    pub business_date: NaiveDate,
    /// The employee code.
    pub emp_code: String,
    /// The shift code the record was resolved against.
    pub shift_code: String,
}

/// One employee's canonical attendance for one business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The business date (a night shift's start date).
    pub business_date: NaiveDate,
    /// The employee code.
    pub emp_code: String,
    /// The shift code, or "Unknown".
    pub shift_code: String,
    /// Resolved check-in.
    pub check_in: Option<DateTime<Utc>>,
    /// Resolved check-out.
    pub check_out: Option<DateTime<Utc>>,
    /// Raw punches attributed to this occurrence.
    #[serde(default)]
    pub punch_count: u32,
    /// HR-set status that replaces the derived one.
    #[serde(default)]
    pub status_override: Option<AttendanceStatus>,
    /// Late arrival beyond grace.
    #[serde(default)]
    pub late: bool,
    /// Early departure beyond grace.
    #[serde(default)]
    pub early_leave: bool,
    /// Minutes late beyond grace.
    #[serde(default)]
    pub late_minutes: i64,
    /// Minutes early beyond grace.
    #[serde(default)]
    pub early_minutes: i64,
    /// HR excuse; suppresses counting without clearing the flags.
    #[serde(default)]
    pub excused: bool,
    /// Free-text HR reason.
    #[serde(default)]
    pub reason: Option<String>,
}

impl AttendanceRecord {
    /// Creates an empty record for the given key.
    pub fn new(
        business_date: NaiveDate,
        emp_code: impl Into<String>,
        shift_code: impl Into<String>,
    ) -> Self {
        Self {
            business_date,
            emp_code: emp_code.into(),
            shift_code: shift_code.into(),
            check_in: None,
            check_out: None,
            punch_count: 0,
            status_override: None,
            late: false,
            early_leave: false,
            late_minutes: 0,
            early_minutes: 0,
            excused: false,
            reason: None,
        }
    }

    /// Returns the record's composite key.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            business_date: self.business_date,
            emp_code: self.emp_code.clone(),
            shift_code: self.shift_code.clone(),
        }
    }

    /// Total punches, never fewer than the resolved endpoints.
    ///
    /// ```
    /// use attendance_engine::models::AttendanceRecord;
    /// use chrono::{NaiveDate, TimeZone, Utc};
    ///
    /// let mut record = AttendanceRecord::new(
    ///     NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
    ///     "E-001",
    ///     "MORNING",
    /// );
    /// record.check_in = Some(Utc.with_ymd_and_hms(2026, 1, 15, 4, 0, 0).unwrap());
    /// assert_eq!(record.total_punches(), 1);
    /// ```
    pub fn total_punches(&self) -> u32 {
        let endpoints = u32::from(self.check_in.is_some()) + u32::from(self.check_out.is_some());
        self.punch_count.max(endpoints)
    }

    /// True when a check-in or any punch was resolved.
    pub fn has_punches(&self) -> bool {
        self.check_in.is_some() || self.punch_count > 0
    }

    /// True when HR has set a status, an excuse or a reason.
    pub fn has_hr_fields(&self) -> bool {
        self.status_override.is_some() || self.excused || self.reason.is_some()
    }

    /// The effective status: the HR override if any, else derived.
    pub fn attendance_status(&self) -> AttendanceStatus {
        match self.status_override {
            Some(status) if status.is_override() => status,
            _ if self.has_punches() => AttendanceStatus::Present,
            _ => AttendanceStatus::Absent,
        }
    }

    /// True when exactly one of check-in / check-out is present.
    pub fn is_missing_one_punch(&self) -> bool {
        self.check_in.is_some() != self.check_out.is_some()
    }

    /// True when a late or early flag exists and is not excused.
    pub fn has_counted_violation(&self) -> bool {
        (self.late || self.early_leave) && !self.excused
    }

    /// Minutes beyond grace across both violation kinds.
    pub fn violation_minutes(&self) -> i64 {
        self.late_minutes + self.early_minutes
    }
}

/// One change to stored attendance records.
///
/// A reconciliation can touch two dates: its own, and the following date
/// when that record was holding endpoints of this occurrence. The writes
/// for one employee are applied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    /// Replace whatever is stored for the record's date and employee.
    Replace(AttendanceRecord),
    /// Delete everything stored for the employee on the date.
    Delete {
        /// The business date.
        business_date: NaiveDate,
        /// The employee code.
        emp_code: String,
    },
}

impl RecordWrite {
    /// Keeps a record worth storing and deletes one left with neither
    /// punches nor HR fields.
    pub fn settle(record: AttendanceRecord) -> Self {
        if record.has_punches() || record.has_hr_fields() {
            RecordWrite::Replace(record)
        } else {
            RecordWrite::Delete {
                business_date: record.business_date,
                emp_code: record.emp_code,
            }
        }
    }

    /// The employee the write belongs to.
    pub fn emp_code(&self) -> &str {
        match self {
            RecordWrite::Replace(record) => &record.emp_code,
            RecordWrite::Delete { emp_code, .. } => emp_code,
        }
    }
}
