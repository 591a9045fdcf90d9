//! Calculation logic for the Attendance Engine.
//!
//! This module contains the rules that turn raw punches into attendance:
//! fixed-offset local time arithmetic, shift window resolution, punch
//! classification, checkout candidate validation, reconciliation,
//! violation detection, monthly deductions, break accounting and
//! heartbeat processing.

mod breaks;
mod checkout_validation;
mod deductions;
mod event_classifier;
mod heartbeat;
mod local_time;
mod reconciler;
mod shift_window;
mod violations;

pub use breaks::{BreakSummary, allowed_minutes, close_interval, rounded_minutes, summarize_breaks};
pub use checkout_validation::{
    CheckoutContext, CheckoutRejection, checkout_rejection, is_valid_checkout,
};
pub use deductions::{
    DeductionResult, calculate_deduction, day_flags, month_day_flags, net_salary,
};
pub use event_classifier::{classify_punch, infer_shift, punch_in_shift};
pub use heartbeat::{apply_heartbeat, derive_state, validate_activity_score};
pub use local_time::LocalOffset;
pub use reconciler::{
    BatchInputs, CandidateSource, EmployeeInputs, Reconciliation, UNKNOWN_SHIFT,
    local_day_bounds, operational_window, reconcile_batch, reconcile_employee, record_writes,
};
pub use shift_window::{ShiftWindow, employee_shift, resolve_shift_window, window_for_date};
pub use violations::{ViolationFlags, detect_record_violations, detect_violations};
