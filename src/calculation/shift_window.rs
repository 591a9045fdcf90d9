//! Shift window resolution.
//!
//! This module decides which shift occurrence "owns" a moment in time and
//! produces the canonical attendance date, start and end instants for it.
//! A night shift's occurrence is always filed under the date it began.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{Employee, ShiftCatalog, ShiftDefinition};

use super::local_time::LocalOffset;

/// One concrete occurrence of a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftWindow {
    /// The shift code.
    pub shift_code: String,
    /// The business date the occurrence is filed under (its start date).
    pub attendance_date: NaiveDate,
    /// Start instant of the occurrence.
    pub shift_start: DateTime<Utc>,
    /// End instant of the occurrence.
    pub shift_end: DateTime<Utc>,
    /// Grace minutes applied at either end.
    pub grace_period_minutes: i64,
}

impl ShiftWindow {
    /// True when `instant` lies in `[shift_start, shift_end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.shift_start <= instant && instant < self.shift_end
    }

    /// Start of the window widened by the grace period.
    pub fn grace_start(&self) -> DateTime<Utc> {
        self.shift_start - Duration::minutes(self.grace_period_minutes)
    }

    /// End of the window widened by the grace period.
    pub fn grace_end(&self) -> DateTime<Utc> {
        self.shift_end + Duration::minutes(self.grace_period_minutes)
    }

    /// Clamps an instant into `[grace_start, grace_end]`.
    pub fn clip(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        instant.clamp(self.grace_start(), self.grace_end())
    }
}

/// Builds the occurrence of `shift` that starts on local date `date`.
pub fn window_for_date(shift: &ShiftDefinition, date: NaiveDate, offset: LocalOffset) -> ShiftWindow {
    ShiftWindow {
        shift_code: shift.code.clone(),
        attendance_date: date,
        shift_start: offset.instant_at_minute(date, shift.start_minute()),
        shift_end: offset.instant_at_minute(date, shift.end_minute()),
        grace_period_minutes: shift.grace_period_minutes,
    }
}

/// Resolves the shift occurrence that owns `instant`.
///
/// For a non-crossing shift the occurrence is always the one on the
/// instant's local date. For a crossing shift two occurrences overlap the
/// local date: today's (window A) and yesterday's (window B). A is tested
/// first, then B. An instant before A that B does not contain gets the
/// upcoming A; anything past A rolls forward to tomorrow's occurrence, so
/// every instant maps to exactly one occurrence.
///
/// # Examples
///
/// ```
/// use attendance_engine::calculation::{LocalOffset, resolve_shift_window};
/// use attendance_engine::config::EngineConfig;
/// use chrono::{NaiveDate, TimeZone, Utc};
///
/// let config = EngineConfig::default();
/// let night = config.catalog().by_code("NIGHT").unwrap();
/// let offset = LocalOffset::parse("+05:00").unwrap();
///
/// // 02:00 local on 16 January belongs to the 15 January night shift
/// let instant = Utc.with_ymd_and_hms(2026, 1, 15, 21, 0, 0).unwrap();
/// let window = resolve_shift_window(night, instant, offset);
/// assert_eq!(window.attendance_date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
/// ```
pub fn resolve_shift_window(
    shift: &ShiftDefinition,
    instant: DateTime<Utc>,
    offset: LocalOffset,
) -> ShiftWindow {
    let today = offset.local_date(instant);
    let window_a = window_for_date(shift, today, offset);
    if !shift.crosses_midnight {
        return window_a;
    }

    if window_a.contains(instant) {
        return window_a;
    }
    let window_b = window_for_date(shift, today - Duration::days(1), offset);
    if window_b.contains(instant) {
        return window_b;
    }
    if instant < window_a.shift_start {
        return window_a;
    }
    window_for_date(shift, today + Duration::days(1), offset)
}

/// Resolves an employee's assigned shift definition.
///
/// The direct id reference wins over the denormalized code text; an id the
/// catalog no longer knows falls through to the code. Inactive shifts
/// still resolve so historical records keep their shift.
///
/// # Errors
///
/// - `NoShiftConfigured` when the employee carries no shift reference
/// - `ShiftNotFound` when no reference matches the catalog; the error
///   names the most direct one
pub fn employee_shift<'a>(
    employee: &Employee,
    catalog: &'a ShiftCatalog,
) -> EngineResult<&'a ShiftDefinition> {
    let refs = employee.shift_refs();
    let first = refs.first().ok_or_else(|| EngineError::NoShiftConfigured {
        emp_code: employee.emp_code.clone(),
    })?;
    refs.iter()
        .find_map(|shift_ref| catalog.resolve(shift_ref).ok())
        .map_or_else(|| catalog.resolve(first), Ok)
}
