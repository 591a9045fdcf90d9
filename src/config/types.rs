//! Configuration types for attendance resolution.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files, and the [`EngineConfig`]
//! object every engine operation receives explicitly.

use chrono::{NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::LocalOffset;
use crate::models::{
    DEFAULT_GRACE_PERIOD_MINUTES, Employee, MINUTES_PER_DAY, ShiftCatalog, ShiftDefinition,
    hhmm,
};

/// The fetch window for one business date's punch batch.
///
/// `start` is on the business date, `end` on the following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalWindow {
    /// Local start on the business date.
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    /// Local end on the following day.
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    /// How long before a shift's start an arrival is still expected.
    #[serde(default = "default_early_arrival")]
    pub early_arrival_minutes: i64,
}

fn default_early_arrival() -> i64 {
    120
}

impl Default for OperationalWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            early_arrival_minutes: default_early_arrival(),
        }
    }
}

/// Window bounds expressed in minutes: `start` from the business date's
/// midnight, `end` from the following day's midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMinutes {
    /// Minutes after the business date's local midnight.
    pub start: i64,
    /// Minutes after the following day's local midnight.
    pub end: i64,
}

impl OperationalWindow {
    /// Widens the configured window so it covers every active shift.
    ///
    /// The start moves back to the earliest expected arrival; the end moves
    /// forward to the latest acceptable crossing-shift checkout.
    pub fn covering(&self, catalog: &ShiftCatalog, end_tolerance_minutes: i64) -> WindowMinutes {
        let configured_start = crate::models::minute_of_day(self.start);
        let configured_end = crate::models::minute_of_day(self.end);

        let start = catalog
            .active()
            .map(|s| s.start_minute() - s.grace_period_minutes - self.early_arrival_minutes)
            .fold(configured_start, i64::min)
            .max(0);
        let end = catalog
            .active()
            .filter(|s| s.crosses_midnight)
            .map(|s| s.end_clock_minute() + end_tolerance_minutes)
            .fold(configured_end, i64::max)
            .min(MINUTES_PER_DAY - 1);

        WindowMinutes { start, end }
    }
}

/// Bounds applied when validating checkout candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutValidationPolicy {
    /// Maximum plausible check-in to check-out gap.
    pub max_span_hours: i64,
    /// How far past a crossing shift's end a checkout may still be.
    pub end_tolerance_minutes: i64,
}

impl Default for CheckoutValidationPolicy {
    fn default() -> Self {
        Self {
            max_span_hours: 30,
            end_tolerance_minutes: 120,
        }
    }
}

/// Payroll deduction policy constants.
///
/// The milestone modulus and per-minute rate replicate current payroll
/// behaviour; they are configurable rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeductionPolicy {
    /// Every Nth violation day is billed as a full day.
    pub milestone_every: u32,
    /// Deduction days per violation minute past the first milestone.
    pub per_minute_rate: Decimal,
    /// Deduction days for a half day.
    pub half_day_weight: Decimal,
    /// Divisor turning a monthly salary into a daily one.
    pub salary_divisor_days: u32,
}

impl Default for DeductionPolicy {
    fn default() -> Self {
        Self {
            milestone_every: 3,
            per_minute_rate: Decimal::new(7, 3),
            half_day_weight: Decimal::new(5, 1),
            salary_divisor_days: 30,
        }
    }
}

/// Break allowances per category. Official breaks are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakPolicy {
    /// Allowance for general (personal) breaks.
    pub general_allowance_minutes: i64,
    /// Allowance for prayer breaks.
    pub namaz_allowance_minutes: i64,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            general_allowance_minutes: 60,
            namaz_allowance_minutes: 25,
        }
    }
}

/// Agent heartbeat thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatPolicy {
    /// ACTIVE heartbeats scoring below this are suspicious.
    pub suspicious_score_below: u8,
    /// Consecutive suspicious heartbeats before the device is flagged.
    pub flag_after_consecutive: u32,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            suspicious_score_below: 70,
            flag_after_consecutive: 3,
        }
    }
}

/// Non-working days used when interpreting a missing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarPolicy {
    /// Weekly days off.
    pub weekly_off_days: Vec<Weekday>,
    /// Public holidays.
    pub public_holidays: Vec<NaiveDate>,
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self {
            weekly_off_days: vec![Weekday::Sun],
            public_holidays: Vec::new(),
        }
    }
}

impl CalendarPolicy {
    /// Returns true if no attendance is expected on the date.
    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.weekly_off_days.contains(&date.weekday()) || self.public_holidays.contains(&date)
    }
}

/// The policy file (`policy.yaml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// The fixed local offset every instant is interpreted in.
    pub utc_offset: LocalOffset,
    /// Punch fetch window.
    #[serde(default)]
    pub operational_window: OperationalWindow,
    /// Checkout candidate validation.
    #[serde(default)]
    pub checkout_validation: CheckoutValidationPolicy,
    /// Deduction constants.
    #[serde(default)]
    pub deduction: DeductionPolicy,
    /// Break allowances.
    #[serde(default)]
    pub breaks: BreakPolicy,
    /// Heartbeat thresholds.
    #[serde(default)]
    pub heartbeat: HeartbeatPolicy,
    /// Working calendar.
    #[serde(default)]
    pub calendar: CalendarPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            utc_offset: LocalOffset::parse("+05:00").unwrap_or_default(),
            operational_window: OperationalWindow::default(),
            checkout_validation: CheckoutValidationPolicy::default(),
            deduction: DeductionPolicy::default(),
            breaks: BreakPolicy::default(),
            heartbeat: HeartbeatPolicy::default(),
            calendar: CalendarPolicy::default(),
        }
    }
}

impl Policy {
    /// Checks policy values for range errors.
    pub fn validate(&self) -> Result<(), String> {
        if self.deduction.milestone_every == 0 {
            return Err("deduction.milestone_every must be positive".to_string());
        }
        if self.deduction.per_minute_rate.is_sign_negative() {
            return Err("deduction.per_minute_rate must not be negative".to_string());
        }
        if self.deduction.half_day_weight.is_sign_negative() {
            return Err("deduction.half_day_weight must not be negative".to_string());
        }
        if self.deduction.salary_divisor_days == 0 {
            return Err("deduction.salary_divisor_days must be positive".to_string());
        }
        if self.checkout_validation.max_span_hours <= 0 {
            return Err("checkout_validation.max_span_hours must be positive".to_string());
        }
        if self.checkout_validation.end_tolerance_minutes < 0 {
            return Err("checkout_validation.end_tolerance_minutes must not be negative".to_string());
        }
        if self.operational_window.early_arrival_minutes < 0 {
            return Err("operational_window.early_arrival_minutes must not be negative".to_string());
        }
        if self.breaks.general_allowance_minutes < 0 || self.breaks.namaz_allowance_minutes < 0 {
            return Err("break allowances must not be negative".to_string());
        }
        if self.heartbeat.suspicious_score_below > 100 {
            return Err("heartbeat.suspicious_score_below must be within 0-100".to_string());
        }
        if self.heartbeat.flag_after_consecutive == 0 {
            return Err("heartbeat.flag_after_consecutive must be positive".to_string());
        }
        Ok(())
    }
}

/// The shift file (`shifts.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct ShiftsConfig {
    /// Shifts in declaration order.
    pub shifts: Vec<ShiftDefinition>,
}

/// The optional roster file (`employees.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    /// Employees to seed the in-memory directory with.
    #[serde(default)]
    pub employees: Vec<Employee>,
}

/// The complete engine configuration.
///
/// Loaded once per process (or built in code) and passed explicitly into
/// every engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    policy: Policy,
    catalog: ShiftCatalog,
}

impl EngineConfig {
    /// Creates a configuration from its parts.
    pub fn new(policy: Policy, catalog: ShiftCatalog) -> Self {
        Self { policy, catalog }
    }

    /// The policy section.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The shift catalog.
    pub fn catalog(&self) -> &ShiftCatalog {
        &self.catalog
    }

    /// The configured local offset.
    pub fn offset(&self) -> LocalOffset {
        self.policy.utc_offset
    }

    /// The operational window widened to cover the catalog.
    pub fn window_minutes(&self) -> WindowMinutes {
        self.policy.operational_window.covering(
            &self.catalog,
            self.policy.checkout_validation.end_tolerance_minutes,
        )
    }
}

fn default_shift(code: &str, id: &str, start: (u32, u32), end: (u32, u32), crosses: bool) -> ShiftDefinition {
    ShiftDefinition {
        id: id.to_string(),
        code: code.to_string(),
        name: format!("{}{}", &code[..1], code[1..].to_ascii_lowercase()),
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or(NaiveTime::MIN),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or(NaiveTime::MIN),
        crosses_midnight: crosses,
        grace_period_minutes: DEFAULT_GRACE_PERIOD_MINUTES,
        active: true,
    }
}

impl Default for EngineConfig {
    /// Offset `+05:00`, default policy, and a three-shift catalog:
    /// MORNING 09:00-18:00, EVENING 14:00-23:00 and NIGHT 22:00-06:00.
    fn default() -> Self {
        let catalog = ShiftCatalog::new(vec![
            default_shift("MORNING", "1", (9, 0), (18, 0), false),
            default_shift("EVENING", "2", (14, 0), (23, 0), false),
            default_shift("NIGHT", "3", (22, 0), (6, 0), true),
        ])
        .unwrap_or_default();
        Self::new(Policy::default(), catalog)
    }
}
