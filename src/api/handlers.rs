//! HTTP handlers for the calendar endpoints.
//!
//! Thin adapters: extract the caller identity and ambient state from
//! the request, call the service, and translate the outcome into the
//! wire shapes. Failures are a status code and `{ "error": string }`,
//! never a partial-success body.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::auth::CallerIdentity;
use crate::calendar::{AmbientState, CalendarService, MutationRequest};
use crate::error::{CalviewError, ReconcileError, StoreError};
use crate::store::Value;

/// Shared state for all handlers.
pub struct ApiState {
    pub service: Arc<CalendarService>,
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Caller identity from the synthetic header scheme. A production
/// embedding substitutes its session layer here.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> CallerIdentity {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let role_id = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    CallerIdentity { user_id, role_id }
}

/// Query parameters become the view's ambient state.
fn ambient_from_query(params: HashMap<String, String>) -> AmbientState {
    params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

pub(crate) fn error_status(err: &CalviewError) -> StatusCode {
    match err {
        CalviewError::Reconcile(ReconcileError::NotAuthorized { .. }) => StatusCode::FORBIDDEN,
        CalviewError::Reconcile(ReconcileError::DurationFieldMissing { .. }) => {
            StatusCode::BAD_REQUEST
        }
        CalviewError::Store(StoreError::RowNotFound { .. })
        | CalviewError::Store(StoreError::TableNotFound(_))
        | CalviewError::UnknownView(_)
        | CalviewError::UnknownTable(_) => StatusCode::NOT_FOUND,
        CalviewError::Map(_) | CalviewError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: CalviewError) -> Response {
    let status = error_status(&err);
    debug!(%err, status = %status, "request failed");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// POST /calendars/{view}/events/update
pub async fn update_event_handler(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    headers: HeaderMap,
    Json(request): Json<MutationRequest>,
) -> Response {
    let caller = caller_from_headers(&headers);
    match state.service.reconcile(&view, &request, &caller).await {
        Ok(event) => (StatusCode::OK, Json(json!({ "event": event }))).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /calendars/{view}/events/{table_id}/{record_id}
pub async fn get_event_handler(
    State(state): State<Arc<ApiState>>,
    Path((view, table_id, record_id)): Path<(String, i64, i64)>,
    headers: HeaderMap,
) -> Response {
    let caller = caller_from_headers(&headers);
    match state
        .service
        .refresh_event(&view, table_id, record_id, &caller)
        .await
    {
        Ok(event) => (StatusCode::OK, Json(json!({ "event": event }))).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /calendars/{view}/events?{ambient...}
pub async fn list_events_handler(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let ambient = ambient_from_query(params);
    match state.service.render(&view, &ambient).await {
        Ok(events) => (StatusCode::OK, Json(json!({ "events": events }))).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /calendars/{view}/destinations?{ambient...}
pub async fn destinations_handler(
    State(state): State<Arc<ApiState>>,
    Path(view): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let ambient = ambient_from_query(params);
    match state.service.connected_destinations(&view, &ambient).await {
        Ok(destinations) => (StatusCode::OK, Json(destinations)).into_response(),
        Err(err) => error_response(err),
    }
}
