//! Payroll-month models: per-day deduction flags and monthly results.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// Parses a `YYYY-MM` string.
    ///
    /// # Examples
    ///
    /// ```
    /// use attendance_engine::models::YearMonth;
    ///
    /// let month = YearMonth::parse("2026-02").unwrap();
    /// assert_eq!(month.days().count(), 28);
    /// assert!(YearMonth::parse("2026-13").is_err());
    /// ```
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let raw = raw.trim();
        let first = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d").map_err(|_| {
            EngineError::validation("month", format!("'{}' is not a YYYY-MM month", raw))
        })?;
        Ok(Self { first })
    }

    /// The month containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date - chrono::Duration::days(i64::from(date.day0())),
        }
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// Last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.days().last().unwrap_or(self.first)
    }

    /// Every calendar day of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let month = self.first.month();
        self.first.iter_days().take_while(move |d| d.month() == month)
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.first.format("%Y-%m"))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        YearMonth::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Deduction-relevant facts for one day, already filtered for excuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayFlags {
    /// The business date.
    pub date: NaiveDate,
    /// An un-excused late or early-leave violation.
    pub violation: bool,
    /// Minutes beyond grace for the violation.
    pub violation_minutes: i64,
    /// No punches, not on leave, not a holiday.
    pub absent: bool,
    /// Unpaid leave.
    pub unpaid_leave: bool,
    /// Half day.
    pub half_day: bool,
    /// Exactly one of check-in / check-out present.
    pub missing_one_punch: bool,
}

impl DayFlags {
    /// A day with nothing to deduct.
    pub fn clear(date: NaiveDate) -> Self {
        Self {
            date,
            violation: false,
            violation_minutes: 0,
            absent: false,
            unpaid_leave: false,
            half_day: false,
            missing_one_punch: false,
        }
    }
}

/// Where a month's deduction days came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    /// Days with an un-excused violation.
    pub violation_days: u32,
    /// Violation days billed as a full milestone day.
    pub milestone_days: u32,
    /// Deduction days from the per-minute fine.
    pub minute_fine_days: Decimal,
    /// Absent days.
    pub absent_days: u32,
    /// Unpaid leave days.
    pub unpaid_leave_days: u32,
    /// Half days.
    pub half_days: u32,
    /// Days with a single punch.
    pub missing_punch_days: u32,
}

/// The monthly deduction result for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyDeduction {
    /// The employee code.
    pub emp_code: String,
    /// The payroll month.
    pub month: YearMonth,
    /// Total deduction days, rounded to 3 decimal places.
    pub salary_deduct_days: Decimal,
    /// Monthly gross salary.
    pub monthly_salary: Decimal,
    /// Salary after deductions, rounded to 2 decimal places.
    pub net_salary: Decimal,
    /// Contribution breakdown.
    pub breakdown: DeductionBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_bounds() {
        let month = YearMonth::parse("2024-02").unwrap();
        assert_eq!(
            month.first_day(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(
            month.last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(month.to_string(), "2024-02");
    }

    #[test]
    fn test_parse_rejects_malformed_month() {
        for raw in ["2026", "2026-1-1", "january", "2026-00"] {
            match YearMonth::parse(raw) {
                Err(EngineError::Validation { field, .. }) => assert_eq!(field, "month"),
                other => panic!("Expected validation error for {}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_containing_month() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        assert_eq!(YearMonth::containing(date).to_string(), "2026-03");
    }

    #[test]
    fn test_month_serde_as_string() {
        let month: YearMonth = serde_json::from_str("\"2026-01\"").unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"2026-01\"");
        assert!(serde_json::from_str::<YearMonth>("\"2026/01\"").is_err());
    }
}
