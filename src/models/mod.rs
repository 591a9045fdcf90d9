//! Core data models for the Attendance Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod break_interval;
mod device;
mod employee;
mod payroll;
mod punch;
mod shift;

pub(crate) use shift::hhmm;

pub use attendance::{AttendanceRecord, AttendanceStatus, RecordKey, RecordWrite};
pub use break_interval::{BreakCategory, BreakInterval};
pub use device::{DeviceSession, DeviceState};
pub use employee::Employee;
pub use payroll::{DayFlags, DeductionBreakdown, MonthlyDeduction, YearMonth};
pub use punch::{EventKind, PunchEvent};
pub use shift::{
    DEFAULT_GRACE_PERIOD_MINUTES, MINUTES_PER_DAY, ShiftCatalog, ShiftDefinition, ShiftRef,
    minute_of_day,
};
