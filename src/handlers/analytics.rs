use crate::{
    converters::line_protocol,
    error::AppError,
    models::{AnalyticsEvent, ClientContext},
};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::{parse_body, track, AppState};

/// Handle /a endpoint
///
/// Unsecured and called from browsers; the origin middleware has already
/// checked the `Origin` header and adds the CORS headers.
pub async fn handle_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    track("/a", accept(&state, &headers, &body))
}

/// CORS preflight for /a, headers are added by the origin middleware
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

fn accept(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Response, AppError> {
    let event: AnalyticsEvent = parse_body(body)?;
    event.validate()?;

    let client = client_context(headers);
    let now = Utc::now();
    let metric = event.to_metric(&client, now.date_naive());

    tracing::debug!(
        service = %metric.service,
        location = %client.location(),
        "Accepted analytics event"
    );

    state.spawn_line(line_protocol::encode_metric(&metric, now.timestamp_millis()));
    Ok(StatusCode::ACCEPTED.into_response())
}

/// Collect the client metadata visitor ids and locations are derived from
pub fn client_context(headers: &HeaderMap) -> ClientContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    ClientContext {
        origin: header("origin").unwrap_or_default(),
        ip: header("cf-connecting-ip").unwrap_or_default(),
        user_agent: header("user-agent").unwrap_or_default(),
        country: header("cf-ipcountry"),
    }
}
