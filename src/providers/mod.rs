//! Shippers for the downstream backends
//!
//! Both backends sit behind Access and accept the same service token.

pub mod loki;
pub mod telegraf;

use crate::{
    config::BackendsConfig,
    converters::loki::PushPayload,
    error::{error_type_name, AppError},
    metrics,
};
use reqwest::{Client, RequestBuilder, StatusCode};

pub const CLIENT_ID_HEADER: &str = "cf-access-client-id";
pub const CLIENT_SECRET_HEADER: &str = "cf-access-client-secret";

/// Attach access headers and the backend timeout, send, and turn a
/// non-success status into `AppError::UpstreamError`
async fn send(request: RequestBuilder, config: &BackendsConfig) -> Result<StatusCode, AppError> {
    let response = request
        .header(CLIENT_ID_HEADER, &config.client_id)
        .header(CLIENT_SECRET_HEADER, &config.client_secret)
        .timeout(config.timeout())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::UpstreamError { status, message });
    }

    Ok(status)
}

/// Ship a line protocol record, logging and counting the outcome
pub async fn ship_line(client: Client, config: BackendsConfig, line: String) {
    let result = telegraf::write_line(&client, &config, line).await;
    report("telegraf", result);
}

/// Ship a Loki payload, logging and counting the outcome. Empty payloads are
/// not sent.
pub async fn ship_logs(client: Client, config: BackendsConfig, payload: PushPayload) {
    if payload.is_empty() {
        tracing::debug!("Skipping empty log payload");
        return;
    }

    let result = loki::push(&client, &config, &payload).await;
    if result.is_ok() {
        for stream in &payload.streams {
            metrics::record_log_lines(stream.stream.level.as_str(), stream.values.len() as u64);
        }
    }
    report("loki", result);
}

fn report(backend: &str, result: Result<StatusCode, AppError>) {
    match result {
        Ok(status) => {
            tracing::info!(backend = backend, status = %status, "Shipped payload");
            metrics::record_shipment(backend, "success");
        }
        Err(err) => {
            match &err {
                AppError::UpstreamError { status, message } => {
                    tracing::warn!(
                        backend = backend,
                        status = %status,
                        body = %message,
                        "Backend rejected payload"
                    );
                }
                other => {
                    tracing::error!(backend = backend, error = %other, "Failed to ship payload");
                }
            }
            metrics::record_shipment(backend, error_type_name(&err));
        }
    }
}
