use crate::{converters::line_protocol, error::AppError, models::MetricEvent};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::{parse_body, track, AppState};

/// Handle /m endpoint
///
/// Server-side metrics, secured by Access in front of the gateway.
pub async fn handle_metric(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    track("/m", accept(&state, &body))
}

fn accept(state: &AppState, body: &[u8]) -> Result<Response, AppError> {
    let event: MetricEvent = parse_body(body)?;
    event.validate()?;

    tracing::debug!(
        service = %event.service,
        measurement = event.kind.measurement(),
        "Accepted metric"
    );

    state.spawn_line(line_protocol::encode_metric(&event, Utc::now().timestamp_millis()));
    Ok(StatusCode::ACCEPTED.into_response())
}
