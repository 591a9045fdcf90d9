//! Shift definitions, shift references and the shift catalog.
//!
//! Shift clock values are local wall-clock times in `HH:mm` form. Whether a
//! shift ends on the following calendar day is carried explicitly by
//! `crosses_midnight` and validated against the clock values when the
//! catalog is built.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: i64 = 1440;

/// Grace period applied when a shift definition does not specify one.
pub const DEFAULT_GRACE_PERIOD_MINUTES: i64 = 20;

fn default_grace() -> i64 {
    DEFAULT_GRACE_PERIOD_MINUTES
}

fn default_active() -> bool {
    true
}

/// Serde adapter for `HH:mm` wall-clock values.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid HH:mm time '{}': {}", raw, e)))
    }
}

/// Returns the minute-of-day (0..1440) of a wall-clock time.
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// A shift definition from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    /// Stable identifier. Defaults to the code when omitted.
    #[serde(default)]
    pub id: String,
    /// Unique shift code (e.g., "NIGHT").
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Local wall-clock start.
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Local wall-clock end.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Whether the end time belongs to the following calendar day.
    #[serde(default)]
    pub crosses_midnight: bool,
    /// Minutes of tolerance at either end of the shift.
    #[serde(default = "default_grace")]
    pub grace_period_minutes: i64,
    /// Inactive shifts are skipped when classifying punches.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ShiftDefinition {
    /// Minute-of-day at which the shift starts.
    pub fn start_minute(&self) -> i64 {
        minute_of_day(self.start_time)
    }

    /// Minute-of-day of the end clock value, without day rollover.
    pub fn end_clock_minute(&self) -> i64 {
        minute_of_day(self.end_time)
    }

    /// End minute measured from the start day's midnight.
    ///
    /// For crossing shifts this is past 1440.
    ///
    /// ```
    /// use attendance_engine::models::ShiftDefinition;
    /// use chrono::NaiveTime;
    ///
    /// let night = ShiftDefinition {
    ///     id: "3".to_string(),
    ///     code: "NIGHT".to_string(),
    ///     name: "Night".to_string(),
    ///     start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
    ///     end_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
    ///     crosses_midnight: true,
    ///     grace_period_minutes: 20,
    ///     active: true,
    /// };
    /// assert_eq!(night.start_minute(), 1320);
    /// assert_eq!(night.end_minute(), 1800);
    /// ```
    pub fn end_minute(&self) -> i64 {
        if self.crosses_midnight {
            self.end_clock_minute() + MINUTES_PER_DAY
        } else {
            self.end_clock_minute()
        }
    }

    /// The grace period as a duration.
    pub fn grace(&self) -> Duration {
        Duration::minutes(self.grace_period_minutes)
    }

    /// Checks the shift's internal consistency.
    ///
    /// A non-crossing shift must end strictly after it starts on the same
    /// day; a crossing shift must end at an earlier clock value.
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("shift code must not be empty".to_string());
        }
        if self.grace_period_minutes < 0 {
            return Err(format!(
                "shift '{}' has a negative grace period",
                self.code
            ));
        }
        let (start, end) = (self.start_minute(), self.end_clock_minute());
        if self.crosses_midnight && end >= start {
            return Err(format!(
                "shift '{}' is marked as crossing midnight but ends at or after its start",
                self.code
            ));
        }
        if !self.crosses_midnight && end <= start {
            return Err(format!(
                "shift '{}' ends at or before its start but is not marked as crossing midnight",
                self.code
            ));
        }
        Ok(())
    }
}

/// A normalized reference to a catalog shift.
///
/// Employee data refers to shifts by id, by code, or by a decorated display
/// string such as `"NIGHT (22:00 - 06:00)"`. All of these are folded into a
/// `ShiftRef` once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ShiftRef {
    /// Reference by catalog id.
    Id(String),
    /// Reference by shift code.
    Code(String),
}

impl ShiftRef {
    /// Normalizes free-form shift text into a code reference.
    ///
    /// Anything from the first `(` onwards is treated as decoration.
    ///
    /// ```
    /// use attendance_engine::models::ShiftRef;
    ///
    /// assert_eq!(
    ///     ShiftRef::from_code_text(" NIGHT (22:00 - 06:00)"),
    ///     Some(ShiftRef::Code("NIGHT".to_string()))
    /// );
    /// assert_eq!(ShiftRef::from_code_text("  "), None);
    /// ```
    pub fn from_code_text(raw: &str) -> Option<ShiftRef> {
        let code = raw.split('(').next().unwrap_or_default().trim();
        if code.is_empty() {
            None
        } else {
            Some(ShiftRef::Code(code.to_string()))
        }
    }
}

impl std::fmt::Display for ShiftRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftRef::Id(id) => write!(f, "id:{}", id),
            ShiftRef::Code(code) => write!(f, "{}", code),
        }
    }
}

/// The ordered shift catalog.
///
/// Declaration order is significant: it is the tie-break when a punch falls
/// inside more than one shift's range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShiftCatalog {
    shifts: Vec<ShiftDefinition>,
}

impl ShiftCatalog {
    /// Builds a catalog, filling empty ids with the code and validating
    /// every definition and code uniqueness.
    pub fn new(shifts: Vec<ShiftDefinition>) -> Result<Self, String> {
        let mut normalized = Vec::with_capacity(shifts.len());
        for mut shift in shifts {
            shift.code = shift.code.trim().to_string();
            if shift.id.trim().is_empty() {
                shift.id = shift.code.clone();
            }
            shift.validate()?;
            if normalized
                .iter()
                .any(|s: &ShiftDefinition| s.code.eq_ignore_ascii_case(&shift.code))
            {
                return Err(format!("duplicate shift code '{}'", shift.code));
            }
            normalized.push(shift);
        }
        Ok(Self { shifts: normalized })
    }

    /// All shifts in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ShiftDefinition> {
        self.shifts.iter()
    }

    /// Active shifts in declaration order.
    pub fn active(&self) -> impl Iterator<Item = &ShiftDefinition> {
        self.shifts.iter().filter(|s| s.active)
    }

    /// Number of shifts in the catalog.
    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    /// Returns true if the catalog holds no shifts.
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Looks up a shift by code, ignoring ASCII case.
    pub fn by_code(&self, code: &str) -> Option<&ShiftDefinition> {
        let code = code.trim();
        self.shifts.iter().find(|s| s.code.eq_ignore_ascii_case(code))
    }

    /// Looks up a shift by id.
    pub fn by_id(&self, id: &str) -> Option<&ShiftDefinition> {
        self.shifts.iter().find(|s| s.id == id)
    }

    /// Resolves a reference, including inactive shifts.
    pub fn resolve(&self, shift_ref: &ShiftRef) -> EngineResult<&ShiftDefinition> {
        let found = match shift_ref {
            ShiftRef::Id(id) => self.by_id(id),
            ShiftRef::Code(code) => self.by_code(code),
        };
        found.ok_or_else(|| EngineError::ShiftNotFound {
            shift: shift_ref.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn make_shift(code: &str, start: (u32, u32), end: (u32, u32), crosses: bool) -> ShiftDefinition {
        ShiftDefinition {
            id: String::new(),
            code: code.to_string(),
            name: code.to_string(),
            start_time: make_time(start.0, start.1),
            end_time: make_time(end.0, end.1),
            crosses_midnight: crosses,
            grace_period_minutes: 20,
            active: true,
        }
    }

    #[test]
    fn test_day_shift_minutes() {
        let shift = make_shift("MORNING", (9, 0), (18, 0), false);
        assert_eq!(shift.start_minute(), 540);
        assert_eq!(shift.end_minute(), 1080);
        assert!(shift.validate().is_ok());
    }

    #[test]
    fn test_crossing_shift_end_rolls_over() {
        let shift = make_shift("NIGHT", (22, 0), (6, 0), true);
        assert_eq!(shift.end_clock_minute(), 360);
        assert_eq!(shift.end_minute(), 1800);
        assert!(shift.validate().is_ok());
    }

    #[test]
    fn test_crossing_flag_must_match_clock_values() {
        let unmarked = make_shift("NIGHT", (22, 0), (6, 0), false);
        assert!(unmarked.validate().is_err());

        let wrongly_marked = make_shift("DAY", (9, 0), (18, 0), true);
        assert!(wrongly_marked.validate().is_err());
    }

    #[test]
    fn test_zero_length_day_shift_is_invalid() {
        let shift = make_shift("ZERO", (9, 0), (9, 0), false);
        assert!(shift.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let yaml = r#"
code: NIGHT
start_time: "22:00"
end_time: "06:00"
crosses_midnight: true
"#;
        let shift: ShiftDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(shift.grace_period_minutes, 20);
        assert!(shift.active);
        assert_eq!(shift.start_time, make_time(22, 0));
    }

    #[test]
    fn test_deserialize_rejects_bad_clock_value() {
        let yaml = r#"
code: BROKEN
start_time: "25:00"
end_time: "06:00"
"#;
        assert!(serde_yaml::from_str::<ShiftDefinition>(yaml).is_err());
    }

    #[test]
    fn test_serialize_uses_hhmm() {
        let shift = make_shift("MORNING", (9, 5), (18, 0), false);
        let json = serde_json::to_value(&shift).unwrap();
        assert_eq!(json["start_time"], "09:05");
        assert_eq!(json["end_time"], "18:00");
    }

    #[test]
    fn test_catalog_fills_ids_and_rejects_duplicates() {
        let catalog = ShiftCatalog::new(vec![
            make_shift("MORNING", (9, 0), (18, 0), false),
            make_shift("NIGHT", (22, 0), (6, 0), true),
        ])
        .unwrap();
        assert_eq!(catalog.by_id("NIGHT").unwrap().code, "NIGHT");
        assert_eq!(catalog.by_code("night").unwrap().code, "NIGHT");

        let duplicate = ShiftCatalog::new(vec![
            make_shift("MORNING", (9, 0), (18, 0), false),
            make_shift("morning", (10, 0), (19, 0), false),
        ]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_catalog_resolve_includes_inactive() {
        let mut retired = make_shift("RETIRED", (7, 0), (15, 0), false);
        retired.active = false;
        let catalog = ShiftCatalog::new(vec![retired]).unwrap();

        assert_eq!(catalog.active().count(), 0);
        let resolved = catalog
            .resolve(&ShiftRef::Code("RETIRED".to_string()))
            .unwrap();
        assert!(!resolved.active);
    }

    #[test]
    fn test_catalog_resolve_unknown_reference() {
        let catalog = ShiftCatalog::default();
        let result = catalog.resolve(&ShiftRef::Id("42".to_string()));
        match result {
            Err(EngineError::ShiftNotFound { shift }) => assert_eq!(shift, "id:42"),
            other => panic!("Expected ShiftNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_shift_ref_strips_display_decoration() {
        assert_eq!(
            ShiftRef::from_code_text("EVENING (14:00-23:00)"),
            Some(ShiftRef::Code("EVENING".to_string()))
        );
        assert_eq!(ShiftRef::from_code_text("(22:00)"), None);
    }
}
