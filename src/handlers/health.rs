use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::AppState;

/// Health check endpoint
/// Returns 200 OK if the service is running
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "service": "ingest-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Readiness check endpoint
/// Reports the backends payloads are currently shipped to
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config.load();
    (StatusCode::OK, Json(json!({
        "status": "ready",
        "service": "ingest-gateway",
        "backends": {
            "telegraf": config.backends.telegraf_url,
            "loki": config.backends.loki_url,
        },
    })))
}
