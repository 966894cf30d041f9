use crate::{
    converters::{loki, tail},
    error::AppError,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::{parse_body, track, AppState};

/// Handle /tail endpoint
///
/// The body is a batch of platform trace items. Each item is translated on
/// its own, so a broken item only replaces itself with a failure report.
/// Items that produce no lines are not shipped.
pub async fn handle_tail(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    track("/tail", accept(&state, &body))
}

fn accept(state: &AppState, body: &[u8]) -> Result<Response, AppError> {
    let items: Vec<Value> = parse_body(body)?;
    let self_service = state.config.load().tail.self_service.clone();

    let total = items.len();
    let payloads: Vec<_> = items
        .into_iter()
        .map(|raw| loki::batch(&tail::translate_or_report(raw, &self_service)))
        .filter(|payload| !payload.is_empty())
        .collect();

    tracing::debug!(items = total, shipped = payloads.len(), "Accepted tail batch");

    state.spawn_logs(payloads);
    Ok(StatusCode::ACCEPTED.into_response())
}
