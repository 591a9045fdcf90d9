//! Fixed-offset local time arithmetic.
//!
//! Every local date, minute-of-day and wall-clock instant in the engine is
//! computed here from an explicit UTC offset. The host timezone is never
//! consulted and daylight-saving transitions are not modelled.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, EngineResult};
use crate::models::minute_of_day;

/// A fixed UTC offset such as `+05:00`.
///
/// # Example
///
/// ```
/// use attendance_engine::calculation::LocalOffset;
/// use chrono::{NaiveDate, TimeZone, Utc};
///
/// let offset = LocalOffset::parse("+05:00").unwrap();
/// let instant = Utc.with_ymd_and_hms(2026, 1, 15, 20, 30, 0).unwrap();
/// // 20:30 UTC is 01:30 the next day at +05:00
/// assert_eq!(offset.local_date(instant), NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
/// assert_eq!(offset.minute_of_day(instant), 90);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalOffset {
    offset: FixedOffset,
}

impl LocalOffset {
    /// Parses an offset string of the form `+HH:MM` / `-HH:MM`.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let invalid = || {
            EngineError::validation(
                "utc_offset",
                format!("'{}' is not an offset of the form +HH:MM", raw),
            )
        };
        let raw = raw.trim();
        let (sign, rest) = match raw.chars().next() {
            Some('+') => (1, &raw[1..]),
            Some('-') => (-1, &raw[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(invalid());
        }
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if hours > 14 || minutes > 59 {
            return Err(invalid());
        }
        let seconds = sign * (hours * 3600 + minutes * 60);
        FixedOffset::east_opt(seconds)
            .map(|offset| Self { offset })
            .ok_or_else(invalid)
    }

    /// The UTC offset itself.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// The underlying chrono offset.
    pub fn fixed(&self) -> FixedOffset {
        self.offset
    }

    /// Local wall-clock datetime of an instant.
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    /// Local calendar date of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date()
    }

    /// Local minute-of-day (0..1440) of an instant.
    pub fn minute_of_day(&self, instant: DateTime<Utc>) -> i64 {
        minute_of_day(self.local(instant).time())
    }

    /// The instant at which the local wall clock reads `time` on `date`.
    pub fn instant_at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(time);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// The instant `minutes` after local midnight of `date`. Values past
    /// 1440 land on following days.
    pub fn instant_at_minute(&self, date: NaiveDate, minutes: i64) -> DateTime<Utc> {
        self.instant_at(date, NaiveTime::MIN) + Duration::minutes(minutes)
    }

    /// Renders an instant in this offset.
    pub fn render(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }
}

impl Default for LocalOffset {
    fn default() -> Self {
        Self::utc()
    }
}

impl std::fmt::Display for LocalOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.offset)
    }
}

impl Serialize for LocalOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LocalOffset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        LocalOffset::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_positive_and_negative_offsets() {
        assert_eq!(
            LocalOffset::parse("+05:00").unwrap().fixed().local_minus_utc(),
            18000
        );
        assert_eq!(
            LocalOffset::parse("-03:30").unwrap().fixed().local_minus_utc(),
            -12600
        );
        assert_eq!(LocalOffset::parse("+00:00").unwrap(), LocalOffset::utc());
    }

    #[test]
    fn test_parse_rejects_malformed_offsets() {
        for raw in ["05:00", "+5:00", "+05", "+05:75", "+15:00", "Asia/Karachi", ""] {
            assert!(LocalOffset::parse(raw).is_err(), "accepted {}", raw);
        }
    }

    #[test]
    fn test_instant_at_is_inverse_of_local() {
        let offset = LocalOffset::parse("+05:00").unwrap();
        let date = make_date(2026, 1, 15);
        let time = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let instant = offset.instant_at(date, time);

        assert_eq!(instant.to_rfc3339(), "2026-01-15T17:00:00+00:00");
        assert_eq!(offset.local(instant), date.and_time(time));
    }

    #[test]
    fn test_instant_at_minute_rolls_into_next_day() {
        let offset = LocalOffset::parse("+05:00").unwrap();
        let instant = offset.instant_at_minute(make_date(2026, 1, 15), 1800);
        assert_eq!(offset.local_date(instant), make_date(2026, 1, 16));
        assert_eq!(offset.minute_of_day(instant), 360);
    }

    #[test]
    fn test_negative_offset_local_date() {
        let offset = LocalOffset::parse("-05:00").unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 1, 16, 2, 0, 0).unwrap();
        assert_eq!(offset.local_date(instant), make_date(2026, 1, 15));
        assert_eq!(offset.minute_of_day(instant), 21 * 60);
    }

    #[test]
    fn test_render_keeps_offset() {
        let offset = LocalOffset::parse("+05:00").unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 1, 15, 4, 0, 0).unwrap();
        assert_eq!(
            offset.render(instant).to_rfc3339(),
            "2026-01-15T09:00:00+05:00"
        );
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let offset: LocalOffset = serde_json::from_str("\"+05:00\"").unwrap();
        assert_eq!(serde_json::to_string(&offset).unwrap(), "\"+05:00\"");
    }
}
