use crate::{converters::loki, error::AppError, models::LogBatch};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{parse_body, track, AppState};

/// Handle /l endpoint
pub async fn handle_logs(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    track("/l", accept(&state, &body))
}

fn accept(state: &AppState, body: &[u8]) -> Result<Response, AppError> {
    let batch: LogBatch = parse_body(body)?;
    batch.validate()?;

    let payload = loki::batch(&batch);
    tracing::debug!(
        service = %batch.service,
        streams = payload.streams.len(),
        lines = payload.line_count(),
        "Accepted log batch"
    );

    state.spawn_logs(vec![payload]);
    Ok(StatusCode::ACCEPTED.into_response())
}
