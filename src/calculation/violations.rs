//! Late arrival and early departure detection.
//!
//! Observed punches are converted into minutes measured from the local
//! midnight of the shift's start day, so a night shift's post-midnight
//! punches compare correctly against its start and end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceRecord, MINUTES_PER_DAY, ShiftCatalog, ShiftDefinition};

use super::local_time::LocalOffset;

/// Late and early-leave flags for one attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViolationFlags {
    /// Arrived more than the grace period after shift start.
    pub late: bool,
    /// Left more than the grace period before shift end.
    pub early_leave: bool,
    /// Minutes late beyond grace, 0 unless `late`.
    pub late_minutes: i64,
    /// Minutes early beyond grace, 0 unless `early_leave`.
    pub early_minutes: i64,
}

impl ViolationFlags {
    /// Copies the flags onto a record. The record's `excused` flag is left
    /// alone: excused and violating are independent.
    pub fn apply_to(&self, record: &mut AttendanceRecord) {
        record.late = self.late;
        record.early_leave = self.early_leave;
        record.late_minutes = self.late_minutes;
        record.early_minutes = self.early_minutes;
    }

    /// True when either violation is present.
    pub fn any(&self) -> bool {
        self.late || self.early_leave
    }
}

fn beyond_grace(raw_minutes: i64, grace: i64) -> (bool, i64) {
    if raw_minutes > grace {
        (true, raw_minutes - grace)
    } else {
        (false, 0)
    }
}

/// Computes late and early-leave flags for a shift occurrence.
///
/// For a crossing shift a checkout minute earlier than the shift's start
/// minute belongs to the next day and is shifted by 1440; a check-in
/// minute earlier than the end clock value is shifted the same way. For a
/// non-crossing shift a checkout on a later local date than the check-in
/// is measured across the day boundary.
///
/// A missing check-in produces no late flag and a missing checkout no
/// early flag.
///
/// # Examples
///
/// ```
/// use attendance_engine::calculation::{LocalOffset, detect_violations};
/// use attendance_engine::config::EngineConfig;
/// use chrono::{TimeZone, Utc};
///
/// let config = EngineConfig::default();
/// let night = config.catalog().by_code("NIGHT").unwrap();
/// let offset = LocalOffset::parse("+05:00").unwrap();
///
/// // 22:50 in, 05:00 out (local +05:00)
/// let check_in = Utc.with_ymd_and_hms(2026, 1, 15, 17, 50, 0).unwrap();
/// let check_out = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
/// let flags = detect_violations(night, Some(check_in), Some(check_out), offset);
/// assert_eq!(flags.late_minutes, 30);
/// assert_eq!(flags.early_minutes, 40);
/// ```
pub fn detect_violations(
    shift: &ShiftDefinition,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    offset: LocalOffset,
) -> ViolationFlags {
    let grace = shift.grace_period_minutes;
    let mut flags = ViolationFlags::default();

    if let Some(check_in) = check_in {
        let mut minute = offset.minute_of_day(check_in);
        if shift.crosses_midnight && minute < shift.end_clock_minute() {
            minute += MINUTES_PER_DAY;
        }
        let raw = (minute - shift.start_minute()).max(0);
        (flags.late, flags.late_minutes) = beyond_grace(raw, grace);
    }

    if let Some(check_out) = check_out {
        let mut minute = offset.minute_of_day(check_out);
        if shift.crosses_midnight {
            if minute < shift.start_minute() {
                minute += MINUTES_PER_DAY;
            }
        } else {
            let anchor = check_in.map(|c| offset.local_date(c)).unwrap_or(offset.local_date(check_out));
            let days = (offset.local_date(check_out) - anchor).num_days().max(0);
            minute += days * MINUTES_PER_DAY;
        }
        let raw = (shift.end_minute() - minute).max(0);
        (flags.early_leave, flags.early_minutes) = beyond_grace(raw, grace);
    }

    flags
}

/// Computes flags for a stored record by looking its shift up in the
/// catalog. A record filed under an unknown shift has no violations.
pub fn detect_record_violations(
    record: &AttendanceRecord,
    catalog: &ShiftCatalog,
    offset: LocalOffset,
) -> ViolationFlags {
    match catalog.by_code(&record.shift_code) {
        Some(shift) => detect_violations(shift, record.check_in, record.check_out, offset),
        None => ViolationFlags::default(),
    }
}
