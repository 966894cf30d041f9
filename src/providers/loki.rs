use crate::{config::BackendsConfig, converters::loki::PushPayload, error::AppError};
use reqwest::{Client, StatusCode};

/// Push a stream payload to Loki
pub async fn push(
    client: &Client,
    config: &BackendsConfig,
    payload: &PushPayload,
) -> Result<StatusCode, AppError> {
    let request = client.post(&config.loki_url).json(payload);
    super::send(request, config).await
}
