//! Configuration loading and management for the Attendance Engine.
//!
//! This module provides functionality to load the engine configuration from
//! YAML files: the local UTC offset, the shift catalog, and the deduction,
//! break, heartbeat and calendar policies.
//!
//! # Example
//!
//! ```no_run
//! use attendance_engine::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config/default").unwrap();
//! println!("Offset: {}", loader.config().offset());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BreakPolicy, CalendarPolicy, CheckoutValidationPolicy, DeductionPolicy, EngineConfig,
    HeartbeatPolicy, OperationalWindow, Policy, RosterConfig, ShiftsConfig, WindowMinutes,
};
