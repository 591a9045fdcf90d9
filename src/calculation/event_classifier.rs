//! Punch classification against the shift catalog.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{ShiftCatalog, ShiftDefinition};

use super::local_time::LocalOffset;

/// Returns true when a punch at `instant` falls inside the occurrence of
/// `shift` filed under `business_date`.
///
/// A non-crossing shift accepts punches on the business date whose local
/// minute lies in `[start, end)`. A crossing shift accepts punches on the
/// business date at or after its start, and punches on the following day
/// before its end clock value.
pub fn punch_in_shift(
    shift: &ShiftDefinition,
    instant: DateTime<Utc>,
    business_date: NaiveDate,
    offset: LocalOffset,
) -> bool {
    let date = offset.local_date(instant);
    let minute = offset.minute_of_day(instant);

    if shift.crosses_midnight {
        (date == business_date && minute >= shift.start_minute())
            || (date == business_date + Duration::days(1) && minute < shift.end_clock_minute())
    } else {
        date == business_date && minute >= shift.start_minute() && minute < shift.end_minute()
    }
}

/// Determines which active shift a punch belongs to on a business date.
///
/// When a punch lies inside more than one shift's range, the first match
/// in catalog declaration order wins.
///
/// # Examples
///
/// ```
/// use attendance_engine::calculation::{LocalOffset, classify_punch};
/// use attendance_engine::config::EngineConfig;
/// use chrono::{NaiveDate, TimeZone, Utc};
///
/// let config = EngineConfig::default();
/// let offset = LocalOffset::parse("+05:00").unwrap();
/// let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
///
/// // 15:00 local falls in both MORNING and EVENING; MORNING is declared first
/// let punch = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
/// let shift = classify_punch(punch, date, config.catalog(), offset).unwrap();
/// assert_eq!(shift.code, "MORNING");
/// ```
pub fn classify_punch<'a>(
    instant: DateTime<Utc>,
    business_date: NaiveDate,
    catalog: &'a ShiftCatalog,
    offset: LocalOffset,
) -> Option<&'a ShiftDefinition> {
    catalog
        .active()
        .find(|shift| punch_in_shift(shift, instant, business_date, offset))
}

/// Infers a shift from a sequence of punches: the classification of the
/// earliest punch that matches any shift.
pub fn infer_shift<'a, I>(
    punches: I,
    business_date: NaiveDate,
    catalog: &'a ShiftCatalog,
    offset: LocalOffset,
) -> Option<&'a ShiftDefinition>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut punches: Vec<DateTime<Utc>> = punches.into_iter().collect();
    punches.sort();
    punches
        .into_iter()
        .find_map(|instant| classify_punch(instant, business_date, catalog, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn make_offset() -> LocalOffset {
        LocalOffset::parse("+05:00").unwrap()
    }

    fn make_date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn make_local(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        make_offset().instant_at_minute(make_date(day), i64::from(hour * 60 + minute))
    }

    fn classify(day: u32, hour: u32, minute: u32) -> Option<String> {
        let config = EngineConfig::default();
        classify_punch(make_local(day, hour, minute), make_date(15), config.catalog(), make_offset())
            .map(|s| s.code.clone())
    }

    #[test]
    fn test_morning_punch() {
        assert_eq!(classify(15, 9, 5).as_deref(), Some("MORNING"));
    }

    #[test]
    fn test_overlap_resolves_to_declaration_order() {
        assert_eq!(classify(15, 15, 0).as_deref(), Some("MORNING"));
    }

    #[test]
    fn test_evening_only_range() {
        assert_eq!(classify(15, 19, 0).as_deref(), Some("EVENING"));
    }

    #[test]
    fn test_night_start_day() {
        assert_eq!(classify(15, 23, 30).as_deref(), Some("NIGHT"));
    }

    #[test]
    fn test_night_following_day_before_end() {
        assert_eq!(classify(16, 2, 0).as_deref(), Some("NIGHT"));
    }

    #[test]
    fn test_following_day_after_end_is_unclassified() {
        assert_eq!(classify(16, 7, 0), None);
    }

    #[test]
    fn test_early_morning_on_business_date_is_unclassified() {
        assert_eq!(classify(15, 3, 0), None);
    }

    #[test]
    fn test_inactive_shift_is_skipped() {
        let config = EngineConfig::default();
        let mut shifts: Vec<ShiftDefinition> = config.catalog().iter().cloned().collect();
        shifts[0].active = false;
        let catalog = ShiftCatalog::new(shifts).unwrap();
        let shift = classify_punch(make_local(15, 15, 0), make_date(15), &catalog, make_offset());
        assert_eq!(shift.unwrap().code, "EVENING");
    }

    #[test]
    fn test_infer_shift_uses_earliest_matching_punch() {
        let config = EngineConfig::default();
        let punches = vec![make_local(16, 5, 50), make_local(15, 3, 0), make_local(15, 22, 5)];
        let shift = infer_shift(punches, make_date(15), config.catalog(), make_offset());
        assert_eq!(shift.unwrap().code, "NIGHT");
    }
}
