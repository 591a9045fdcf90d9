//! HTTP request handlers for the Attendance Engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

use super::request::{
    CloseBreakRequest, HeartbeatRequest, OpenBreakRequest, PunchRequest, ReconcileRequest,
    ShiftWindowQuery, UpdateBreakCategoryRequest, parse_date, to_utc,
};
use super::response::{
    ApiError, ApiErrorResponse, BreakClosedResponse, BreakOpenedResponse, BreakView,
    HeartbeatResponse, PunchView, ReconcileResponse, ShiftWindowView, SweepResponse,
    ViolationsResponse,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/shift-window/:emp_code", get(shift_window_handler))
        .route("/attendance/reconcile", post(reconcile_handler))
        .route("/attendance/:date/:emp_code/violations", get(violations_handler))
        .route("/payroll/:emp_code/:month", get(payroll_handler))
        .route("/breaks/open", post(open_break_handler))
        .route("/breaks/category", patch(update_break_category_handler))
        .route("/breaks/close", post(close_break_handler))
        .route("/breaks/sweep", post(sweep_handler))
        .route("/breaks/:emp_code/:date/summary", get(break_summary_handler))
        .route("/punches", post(punch_handler))
        .route("/agent/heartbeat", post(heartbeat_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], Json(body)).into_response()
}

fn error_response(correlation_id: Uuid, err: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        error = %err,
        "Request failed"
    );
    let api_error: ApiErrorResponse = err.into();
    json_response(api_error.status, api_error.error)
}

fn respond<T: Serialize>(correlation_id: Uuid, status: StatusCode, result: EngineResult<T>) -> Response {
    match result {
        Ok(body) => json_response(status, body),
        Err(err) => error_response(correlation_id, err),
    }
}

fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // serde's message carries the offending field
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Handler for GET /shift-window/:emp_code?at=
async fn shift_window_handler(
    State(state): State<AppState>,
    Path(emp_code): Path<String>,
    query: Result<Query<ShiftWindowQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, emp_code = %emp_code, "Resolving shift window");

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!(correlation_id = %correlation_id, error = %rejection, "Query rejected");
            return json_response(
                StatusCode::BAD_REQUEST,
                ApiError::validation_error(rejection.body_text()),
            );
        }
    };

    let engine = state.engine();
    let at = to_utc(query.at).unwrap_or_else(|| engine.now());
    let offset = engine.config().offset();
    let result = engine
        .resolve_shift_window(&emp_code, at)
        .map(|window| ShiftWindowView::render(&window, offset));
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for POST /attendance/reconcile.
async fn reconcile_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReconcileRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(correlation_id = %correlation_id, business_date = %request.date, "Processing reconciliation request");

    let engine = state.engine();
    let start_time = Instant::now();
    match engine.reconcile_business_date(request.date) {
        Ok(report) => {
            info!(
                correlation_id = %correlation_id,
                business_date = %report.business_date,
                written = report.written,
                failed = report.failures.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Reconciliation completed"
            );
            json_response(
                StatusCode::OK,
                ReconcileResponse::render(&report, engine.config().offset()),
            )
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for GET /attendance/:date/:emp_code/violations.
async fn violations_handler(
    State(state): State<AppState>,
    Path((date, emp_code)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, emp_code = %emp_code, date = %date, "Detecting violations");

    let engine = state.engine();
    let result = parse_date("date", &date)
        .and_then(|date| engine.attendance_record(date, &emp_code))
        .map(|record| ViolationsResponse {
            flags: engine.detect_violations(&record),
            status: record.attendance_status(),
            emp_code: record.emp_code,
            business_date: record.business_date,
            shift_code: record.shift_code,
        });
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for GET /payroll/:emp_code/:month.
async fn payroll_handler(
    State(state): State<AppState>,
    Path((emp_code, month)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, emp_code = %emp_code, month = %month, "Computing monthly deduction");

    let result = state.engine().compute_monthly_deduction(&emp_code, &month);
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for POST /breaks/open.
async fn open_break_handler(
    State(state): State<AppState>,
    payload: Result<Json<OpenBreakRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(correlation_id = %correlation_id, emp_code = %request.emp_code, "Opening break");

    let engine = state.engine();
    let offset = engine.config().offset();
    let result = engine
        .open_break(
            &request.emp_code,
            to_utc(request.at),
            request.category.as_deref(),
            request.reason,
        )
        .map(|opened| BreakOpenedResponse {
            opened: BreakView::render(&opened.opened, offset),
            force_closed: opened.force_closed.as_ref().map(|b| BreakView::render(b, offset)),
        });
    respond(correlation_id, StatusCode::CREATED, result)
}

/// Handler for PATCH /breaks/category.
async fn update_break_category_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateBreakCategoryRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        emp_code = %request.emp_code,
        category = %request.category,
        "Updating break category"
    );

    let engine = state.engine();
    let offset = engine.config().offset();
    let result = engine
        .update_break_category(&request.emp_code, &request.category, request.reason)
        .map(|interval| BreakView::render(&interval, offset));
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for POST /breaks/close.
async fn close_break_handler(
    State(state): State<AppState>,
    payload: Result<Json<CloseBreakRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(correlation_id = %correlation_id, emp_code = %request.emp_code, "Closing break");

    let engine = state.engine();
    let offset = engine.config().offset();
    let result = engine
        .close_break(&request.emp_code, to_utc(request.at))
        .map(|closed| BreakClosedResponse {
            closed: closed.as_ref().map(|b| BreakView::render(b, offset)),
        });
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for POST /breaks/sweep.
async fn sweep_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Sweeping stale breaks");

    let engine = state.engine();
    let offset = engine.config().offset();
    let result = engine.close_stale_breaks().map(|closed| SweepResponse {
        closed: closed.iter().map(|b| BreakView::render(b, offset)).collect(),
    });
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for GET /breaks/:emp_code/:date/summary.
async fn break_summary_handler(
    State(state): State<AppState>,
    Path((emp_code, date)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, emp_code = %emp_code, date = %date, "Summarizing breaks");

    let result = parse_date("date", &date).and_then(|date| state.engine().break_summary(&emp_code, date));
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for POST /punches.
async fn punch_handler(
    State(state): State<AppState>,
    payload: Result<Json<PunchRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(correlation_id = %correlation_id, emp_code = %request.emp_code, "Recording punch");

    let engine = state.engine();
    let offset = engine.config().offset();
    let event_time = request.event_time.with_timezone(&chrono::Utc);
    let result = engine
        .record_punch(&request.emp_code, event_time)
        .map(|event| PunchView::render(&event, offset));
    respond(correlation_id, StatusCode::CREATED, result)
}

/// Handler for POST /agent/heartbeat.
async fn heartbeat_handler(
    State(state): State<AppState>,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let engine = state.engine();
    let offset = engine.config().offset();
    let result = engine
        .record_heartbeat(
            &request.device_id,
            &request.emp_code,
            request.state,
            request.activity_score,
            to_utc(request.at),
        )
        .map(|outcome| HeartbeatResponse::render(&outcome, offset));
    respond(correlation_id, StatusCode::OK, result)
}
