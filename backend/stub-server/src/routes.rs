use crate::error::Result as StubResult;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde_json::json;
use sidecar::health::HEALTH_PATH;
use sidecar::shutdown::SHUTDOWN_PATH;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct AppState {
    pub started: Instant,
    pub ready_delay: Duration,
    pub ignore_shutdown: bool,
    pub shutdown_tx: Arc<watch::Sender<bool>>,
}

/// Bind the loopback listener for `port` (0 picks an ephemeral port).
pub async fn bind_listener(port: u16) -> StubResult<TcpListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Server listening on {}", listener.local_addr()?);
    Ok(listener)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(SHUTDOWN_PATH, post(shutdown_handler))
        .with_state(state)
}

/// GET /healthz - 200 once the simulated warm-up has passed
pub async fn health_check(State(state): State<AppState>) -> Response {
    if state.started.elapsed() < state.ready_delay {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        )
            .into_response();
    }

    let health = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "pid": std::process::id(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(health)).into_response()
}

/// POST /__internal__/shutdown - acknowledged immediately, exit follows
pub async fn shutdown_handler(State(state): State<AppState>) -> StatusCode {
    if state.ignore_shutdown {
        warn!("Graceful shutdown requested via HTTP, ignoring");
        return StatusCode::ACCEPTED;
    }

    info!("Graceful shutdown requested via HTTP");
    state.shutdown_tx.send_replace(true);
    StatusCode::ACCEPTED
}
