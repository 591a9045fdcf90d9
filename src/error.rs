//! Error types for the Attendance Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while resolving attendance.
//! Inconsistent source data (a checkout before a check-in, an implausible
//! gap) is never an error: those candidates are discarded during
//! reconciliation instead.

use thiserror::Error;

/// The main error type for the Attendance Engine.
///
/// # Example
///
/// ```
/// use attendance_engine::error::EngineError;
///
/// let error = EngineError::EmployeeNotFound {
///     emp_code: "E-404".to_string(),
/// };
/// assert_eq!(error.to_string(), "Employee not found: E-404");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed or holds invalid values.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// No employee exists with the given code.
    #[error("Employee not found: {emp_code}")]
    EmployeeNotFound {
        /// The employee code that was not found.
        emp_code: String,
    },

    /// A shift reference did not match any catalog entry.
    #[error("Shift not found: {shift}")]
    ShiftNotFound {
        /// The shift reference as it was given.
        shift: String,
    },

    /// The employee has no shift assigned.
    #[error("No shift configured for employee {emp_code}")]
    NoShiftConfigured {
        /// The employee code.
        emp_code: String,
    },

    /// A break category could not be mapped onto the closed category set.
    #[error("Unrecognized break category: {category}")]
    InvalidBreakCategory {
        /// The category text as it was given.
        category: String,
    },

    /// The employee has no open break to update.
    #[error("No open break for employee {emp_code}")]
    NoOpenBreak {
        /// The employee code.
        emp_code: String,
    },

    /// An input value was malformed or out of range.
    #[error("Invalid value for '{field}': {message}")]
    Validation {
        /// The field that was invalid.
        field: String,
        /// A human-readable reason.
        message: String,
    },

    /// The persistence collaborator rejected an operation.
    #[error("Storage error: {message}")]
    Storage {
        /// A description of the storage failure.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for building a [`EngineError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true for the "not found" family, which callers must not retry.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::EmployeeNotFound { .. }
                | EngineError::ShiftNotFound { .. }
                | EngineError::NoShiftConfigured { .. }
                | EngineError::NoOpenBreak { .. }
        )
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
