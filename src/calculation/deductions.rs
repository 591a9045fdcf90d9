//! Monthly payroll deduction calculation.
//!
//! This module turns a month of attendance records into fractional
//! deduction days using the milestone rule, and applies them to the
//! monthly salary. Nothing here is persisted: the result is always
//! re-derived from the month's records.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{CalendarPolicy, DeductionPolicy};
use crate::models::{AttendanceRecord, AttendanceStatus, DayFlags, DeductionBreakdown, YearMonth};

/// The result of a deduction calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeductionResult {
    /// Total deduction days, rounded to 3 decimal places.
    pub salary_deduct_days: Decimal,
    /// Contribution breakdown.
    pub breakdown: DeductionBreakdown,
}

/// Derives the deduction flags for one day.
///
/// A day without a record is absent unless it is a weekly off day or a
/// public holiday. Holiday, paid leave, unpaid leave and work-from-home
/// records are exempt from punch-based deductions; unpaid leave is billed
/// on its own. A half day is billed at the half-day weight only. The
/// `excused` flag suppresses both violation and missing-punch counting.
pub fn day_flags(
    date: NaiveDate,
    record: Option<&AttendanceRecord>,
    calendar: &CalendarPolicy,
) -> DayFlags {
    let mut flags = DayFlags::clear(date);
    let Some(record) = record else {
        flags.absent = !calendar.is_day_off(date);
        return flags;
    };

    match record.attendance_status() {
        AttendanceStatus::UnpaidLeave => flags.unpaid_leave = true,
        AttendanceStatus::HalfDay => flags.half_day = true,
        AttendanceStatus::Absent => flags.absent = !calendar.is_day_off(date),
        AttendanceStatus::Present => {
            if record.has_counted_violation() {
                flags.violation = true;
                flags.violation_minutes = record.violation_minutes();
            }
            flags.missing_one_punch = record.is_missing_one_punch() && !record.excused;
        }
        AttendanceStatus::Holiday | AttendanceStatus::PaidLeave | AttendanceStatus::WorkFromHome => {}
    }
    flags
}

/// Builds the day-ordered flags for `month`, up to and including
/// `through` (clamped to the month).
pub fn month_day_flags(
    month: YearMonth,
    through: NaiveDate,
    records: &[AttendanceRecord],
    calendar: &CalendarPolicy,
) -> Vec<DayFlags> {
    let mut by_date: HashMap<NaiveDate, &AttendanceRecord> = HashMap::new();
    for record in records {
        by_date.entry(record.business_date).or_insert(record);
    }

    month
        .days()
        .take_while(|date| *date <= through)
        .map(|date| day_flags(date, by_date.get(&date).copied(), calendar))
        .collect()
}

/// Calculates deduction days from a day-ordered sequence of flags.
///
/// A running violation index counts days with an un-excused violation.
/// Every `milestone_every`-th such day contributes exactly one day and
/// nothing from its minutes. Other violation days contribute
/// `minutes × per_minute_rate`, but only once the index is past the first
/// milestone; the earlier non-milestone days contribute nothing. Absent,
/// unpaid leave and missing-punch days each contribute one day, half days
/// the half-day weight.
///
/// # Examples
///
/// ```
/// use attendance_engine::calculation::calculate_deduction;
/// use attendance_engine::config::DeductionPolicy;
/// use attendance_engine::models::DayFlags;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let days: Vec<DayFlags> = (1..=6)
///     .map(|d| {
///         let mut flags = DayFlags::clear(NaiveDate::from_ymd_opt(2026, 1, d).unwrap());
///         flags.violation = true;
///         flags.violation_minutes = 30;
///         flags
///     })
///     .collect();
///
/// let result = calculate_deduction(&days, &DeductionPolicy::default());
/// assert_eq!(result.salary_deduct_days, Decimal::new(242, 2));
/// ```
pub fn calculate_deduction(days: &[DayFlags], policy: &DeductionPolicy) -> DeductionResult {
    let milestone = policy.milestone_every.max(1);
    let mut breakdown = DeductionBreakdown::default();
    let mut violation_index: u32 = 0;
    let mut total = Decimal::ZERO;

    for day in days {
        if day.violation {
            violation_index += 1;
            breakdown.violation_days += 1;
            if violation_index % milestone == 0 {
                breakdown.milestone_days += 1;
                total += Decimal::ONE;
            } else if violation_index > milestone {
                let fine = Decimal::from(day.violation_minutes.max(0)) * policy.per_minute_rate;
                breakdown.minute_fine_days += fine;
                total += fine;
            }
        }
        if day.absent {
            breakdown.absent_days += 1;
            total += Decimal::ONE;
        }
        if day.unpaid_leave {
            breakdown.unpaid_leave_days += 1;
            total += Decimal::ONE;
        }
        if day.half_day {
            breakdown.half_days += 1;
            total += policy.half_day_weight;
        }
        if day.missing_one_punch {
            breakdown.missing_punch_days += 1;
            total += Decimal::ONE;
        }
    }

    DeductionResult {
        salary_deduct_days: total.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero),
        breakdown,
    }
}

/// Applies deduction days to a monthly salary:
/// `salary − (salary / divisor) × days`, rounded to 2 decimal places.
pub fn net_salary(monthly_salary: Decimal, deduct_days: Decimal, policy: &DeductionPolicy) -> Decimal {
    let divisor = Decimal::from(policy.salary_divisor_days.max(1));
    let daily = monthly_salary / divisor;
    (monthly_salary - daily * deduct_days).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
