//! HTTP API module for the Attendance Engine.
//!
//! A thin axum adapter over [`crate::engine::AttendanceEngine`]: it parses
//! requests, delegates, and renders results and errors as JSON.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    CloseBreakRequest, HeartbeatRequest, OpenBreakRequest, PunchRequest, ReconcileRequest,
    ShiftWindowQuery, UpdateBreakCategoryRequest,
};
pub use response::{
    ApiError, ApiErrorResponse, AttendanceRecordView, BreakClosedResponse, BreakOpenedResponse,
    BreakView, HeartbeatResponse, PunchView, ReconcileResponse, ShiftWindowView, SweepResponse,
    ViolationsResponse,
};
pub use state::AppState;
