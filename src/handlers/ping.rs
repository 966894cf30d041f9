use axum::{http::StatusCode, response::IntoResponse};

/// Liveness probe for clients, answers any method
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}
