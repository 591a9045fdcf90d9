//! Break interval accounting.
//!
//! Closing a break clips it to the owning shift occurrence widened by the
//! grace period, so a forgotten close cannot accrue unbounded idle time,
//! then applies the per-category allowance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::BreakPolicy;
use crate::models::{BreakCategory, BreakInterval};

use super::shift_window::ShiftWindow;

/// Allowed minutes for a category; `None` means unbounded.
///
/// A break that is still `Pending` when it closes is held to the general
/// allowance.
pub fn allowed_minutes(category: BreakCategory, policy: &BreakPolicy) -> Option<i64> {
    match category {
        BreakCategory::Official => None,
        BreakCategory::General | BreakCategory::Pending => Some(policy.general_allowance_minutes),
        BreakCategory::Namaz => Some(policy.namaz_allowance_minutes),
    }
}

/// Whole minutes between two instants, rounded half up, never negative.
pub fn rounded_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let millis = (to - from).num_milliseconds().max(0);
    (millis + 30_000) / 60_000
}

/// Closes an open break at `ended_at`.
///
/// When the owning shift window is known, both ends are clamped into its
/// grace bounds before the duration is taken. The duration, allowance and
/// exceeded minutes are then filled in.
pub fn close_interval(
    interval: &mut BreakInterval,
    ended_at: DateTime<Utc>,
    window: Option<&ShiftWindow>,
    policy: &BreakPolicy,
) {
    let (started_at, mut ended_at) = match window {
        Some(window) => (window.clip(interval.started_at), window.clip(ended_at)),
        None => (interval.started_at, ended_at),
    };
    if ended_at < started_at {
        ended_at = started_at;
    }

    let duration = rounded_minutes(started_at, ended_at);
    let allowed = allowed_minutes(interval.category, policy);

    interval.started_at = started_at;
    interval.ended_at = Some(ended_at);
    interval.duration_minutes = Some(duration);
    interval.allowed_minutes = allowed;
    interval.exceeded_minutes = allowed.map_or(0, |allowed| (duration - allowed).max(0));
}

/// Productivity totals for one employee's breaks on one business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakSummary {
    /// The employee code.
    pub emp_code: String,
    /// The business date.
    pub business_date: NaiveDate,
    /// Number of breaks, open ones included.
    pub break_count: usize,
    /// Number of breaks still open.
    pub open_breaks: usize,
    /// Minutes across closed breaks.
    pub total_minutes: i64,
    /// Minutes on official (productive) breaks.
    pub productive_minutes: i64,
    /// Minutes on every other category.
    pub non_productive_minutes: i64,
    /// Minutes beyond category allowances.
    pub exceeded_minutes: i64,
}

/// Summarizes a set of break intervals.
pub fn summarize_breaks(
    emp_code: &str,
    business_date: NaiveDate,
    breaks: &[BreakInterval],
) -> BreakSummary {
    let mut summary = BreakSummary {
        emp_code: emp_code.to_string(),
        business_date,
        break_count: breaks.len(),
        open_breaks: 0,
        total_minutes: 0,
        productive_minutes: 0,
        non_productive_minutes: 0,
        exceeded_minutes: 0,
    };

    for interval in breaks {
        let Some(duration) = interval.duration_minutes else {
            summary.open_breaks += 1;
            continue;
        };
        summary.total_minutes += duration;
        if interval.category.is_productive() {
            summary.productive_minutes += duration;
        } else {
            summary.non_productive_minutes += duration;
        }
        summary.exceeded_minutes += interval.exceeded_minutes;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{LocalOffset, window_for_date};
    use crate::config::EngineConfig;
    use uuid::Uuid;

    fn make_offset() -> LocalOffset {
        LocalOffset::parse("+05:00").unwrap()
    }

    fn make_date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn make_local(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        make_offset().instant_at_minute(make_date(day), i64::from(hour * 60 + minute))
    }

    fn make_break(category: BreakCategory, started_at: DateTime<Utc>) -> BreakInterval {
        BreakInterval {
            id: Uuid::new_v4(),
            emp_code: "E-001".to_string(),
            business_date: make_date(15),
            shift_code: "MORNING".to_string(),
            category,
            reason: None,
            started_at,
            ended_at: None,
            duration_minutes: None,
            allowed_minutes: None,
            exceeded_minutes: 0,
        }
    }

    fn morning_window() -> ShiftWindow {
        let config = EngineConfig::default();
        window_for_date(config.catalog().by_code("MORNING").unwrap(), make_date(15), make_offset())
    }

    #[test]
    fn test_rounded_minutes_half_up() {
        let start = make_local(15, 12, 0);
        assert_eq!(rounded_minutes(start, start + chrono::Duration::seconds(89)), 1);
        assert_eq!(rounded_minutes(start, start + chrono::Duration::seconds(90)), 2);
        assert_eq!(rounded_minutes(start, start - chrono::Duration::seconds(90)), 0);
    }

    #[test]
    fn test_close_general_break_exceeding_allowance() {
        let mut interval = make_break(BreakCategory::General, make_local(15, 12, 0));
        close_interval(&mut interval, make_local(15, 13, 15), Some(&morning_window()), &BreakPolicy::default());

        assert_eq!(interval.duration_minutes, Some(75));
        assert_eq!(interval.allowed_minutes, Some(60));
        assert_eq!(interval.exceeded_minutes, 15);
        assert!(!interval.is_open());
    }

    #[test]
    fn test_close_clips_to_grace_end() {
        let mut interval = make_break(BreakCategory::Namaz, make_local(15, 18, 0));
        close_interval(&mut interval, make_local(15, 23, 0), Some(&morning_window()), &BreakPolicy::default());

        assert_eq!(interval.ended_at, Some(make_local(15, 18, 20)));
        assert_eq!(interval.duration_minutes, Some(20));
        assert_eq!(interval.exceeded_minutes, 0);
    }

    #[test]
    fn test_close_entirely_outside_window_is_zero() {
        let mut interval = make_break(BreakCategory::General, make_local(15, 20, 0));
        close_interval(&mut interval, make_local(15, 21, 0), Some(&morning_window()), &BreakPolicy::default());
        assert_eq!(interval.duration_minutes, Some(0));
    }

    #[test]
    fn test_official_break_is_unbounded() {
        let mut interval = make_break(BreakCategory::Official, make_local(15, 10, 0));
        close_interval(&mut interval, make_local(15, 14, 0), Some(&morning_window()), &BreakPolicy::default());
        assert_eq!(interval.allowed_minutes, None);
        assert_eq!(interval.exceeded_minutes, 0);
    }

    #[test]
    fn test_pending_break_uses_general_allowance() {
        assert_eq!(allowed_minutes(BreakCategory::Pending, &BreakPolicy::default()), Some(60));
    }

    #[test]
    fn test_close_without_window_is_not_clipped() {
        let mut interval = make_break(BreakCategory::General, make_local(15, 20, 0));
        close_interval(&mut interval, make_local(15, 21, 0), None, &BreakPolicy::default());
        assert_eq!(interval.duration_minutes, Some(60));
    }

    #[test]
    fn test_summary_splits_productive_time() {
        let policy = BreakPolicy::default();
        let window = morning_window();
        let mut official = make_break(BreakCategory::Official, make_local(15, 10, 0));
        close_interval(&mut official, make_local(15, 10, 45), Some(&window), &policy);
        let mut namaz = make_break(BreakCategory::Namaz, make_local(15, 13, 0));
        close_interval(&mut namaz, make_local(15, 13, 30), Some(&window), &policy);
        let open = make_break(BreakCategory::Pending, make_local(15, 16, 0));

        let summary = summarize_breaks("E-001", make_date(15), &[official, namaz, open]);
        assert_eq!(summary.break_count, 3);
        assert_eq!(summary.open_breaks, 1);
        assert_eq!(summary.total_minutes, 75);
        assert_eq!(summary.productive_minutes, 45);
        assert_eq!(summary.non_productive_minutes, 30);
        assert_eq!(summary.exceeded_minutes, 5);
    }
}
