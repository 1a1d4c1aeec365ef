//! `procflow serve` -- HTTP JSON API over the workflow service.
//!
//! Endpoints:
//! - GET   /api/v1/health                                     - Server status
//! - POST  /api/v1/process/                                   - Submit a process
//! - GET   /api/v1/process/{type}/list                        - Page through a type
//! - GET   /api/v1/process/{type}/{uuid}                      - One process
//! - PATCH /api/v1/process/{type}/{uuid}/assign/{status}      - Assign a status
//!
//! `list` reads the page from the `X-Page` and `X-Page-Size` headers. Errors
//! are `{"status": "error", "message": ...}`.

mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use procflow_config::Config;
use procflow_engine::{ConfigValidator, ProcessService};
use procflow_storage::{MemoryStorage, ProcessStorage};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_assign_status, handle_get_process, handle_health, handle_list_processes,
    handle_not_found, handle_submit,
};
use self::state::AppState;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({"status": "error", "message": message})),
    )
}

/// Build the router over an already-wired service.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/process", post(handle_submit))
        .route("/api/v1/process/", post(handle_submit))
        .route("/api/v1/process/{type}/list", get(handle_list_processes))
        .route("/api/v1/process/{type}/{uuid}", get(handle_get_process))
        .route(
            "/api/v1/process/{type}/{uuid}/assign/{status}",
            patch(handle_assign_status),
        )
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port with an in-memory store.
pub async fn start_server(port: u16, config: Config) -> anyhow::Result<()> {
    let registry = Arc::new(config.into_registry().context("invalid process config")?);
    let validator = ConfigValidator::new(registry.clone()).context("invalid payload schema")?;
    tracing::info!(
        process_types = registry.len(),
        schemas = validator.schema_count(),
        "workflow engine ready"
    );

    let storage: Arc<dyn ProcessStorage> = Arc::new(MemoryStorage::new());
    let state = Arc::new(AppState {
        service: ProcessService::new(storage, Arc::new(validator)),
    });
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("procflow listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
