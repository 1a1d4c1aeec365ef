//! HTTP route handlers for the process API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use procflow_engine::{page_or_default, ErrorKind, NewProcess, Payload, ProcessError};
use serde::Deserialize;

use super::json_error;
use super::state::AppState;

const PAGE_HEADER: &str = "x-page";
const PAGE_SIZE_HEADER: &str = "x-page-size";

/// Body of an assign-status request. An empty body means a `null` payload.
#[derive(Debug, Default, Deserialize)]
struct AssignBody {
    #[serde(default)]
    payload: Payload,
}

/// Map a service error onto its HTTP status.
fn process_error_response(e: ProcessError) -> Response {
    let status = match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => {
            tracing::error!(error = %e, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, &e.to_string()).into_response()
}

/// Read an optional integer header. Absent means 0, which the service
/// turns into the default.
fn int_header(headers: &HeaderMap, name: &str) -> Result<i64, String> {
    match headers.get(name) {
        None => Ok(0),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| format!("invalid {} header", name)),
    }
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /api/v1/health
pub(crate) async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "OK"})))
}

/// POST /api/v1/process/
pub(crate) async fn handle_submit(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let new_process: NewProcess = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, &format!("invalid request body: {}", e))
                .into_response()
        }
    };
    if new_process.process_type.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "process type is required").into_response();
    }

    match state.service.submit(new_process).await {
        Ok(uuid) => (StatusCode::OK, Json(serde_json::json!({ "uuid": uuid }))).into_response(),
        Err(e) => process_error_response(e),
    }
}

/// GET /api/v1/process/{type}/list
pub(crate) async fn handle_list_processes(
    State(state): State<Arc<AppState>>,
    Path(process_type): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (page, page_size) = match (
        int_header(&headers, PAGE_HEADER),
        int_header(&headers, PAGE_SIZE_HEADER),
    ) {
        (Ok(page), Ok(page_size)) => page_or_default(page, page_size),
        (Err(msg), _) | (_, Err(msg)) => {
            return json_error(StatusCode::BAD_REQUEST, &msg).into_response()
        }
    };

    match state
        .service
        .get(&process_type, None, page, page_size)
        .await
    {
        Ok(processes) => {
            let response = serde_json::json!({
                "data": processes,
                "page": page,
                "page_size": page_size,
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => process_error_response(e),
    }
}

/// GET /api/v1/process/{type}/{uuid}
pub(crate) async fn handle_get_process(
    State(state): State<Arc<AppState>>,
    Path((process_type, uuid)): Path<(String, String)>,
) -> Response {
    match state.service.get(&process_type, Some(&uuid), 0, 0).await {
        Ok(processes) => (StatusCode::OK, Json(processes)).into_response(),
        Err(e) => process_error_response(e),
    }
}

/// PATCH /api/v1/process/{type}/{uuid}/assign/{status}
pub(crate) async fn handle_assign_status(
    State(state): State<Arc<AppState>>,
    Path((process_type, uuid, status)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        AssignBody::default()
    } else {
        match serde_json::from_slice::<AssignBody>(&body) {
            Ok(b) => b,
            Err(e) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid request body: {}", e),
                )
                .into_response()
            }
        }
    };

    match state
        .service
        .assign_status(&process_type, &uuid, &status, body.payload)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => process_error_response(e),
    }
}
