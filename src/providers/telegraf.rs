use crate::{config::BackendsConfig, error::AppError};
use reqwest::{Client, StatusCode};

/// Ship one line protocol record to Telegraf
pub async fn write_line(
    client: &Client,
    config: &BackendsConfig,
    line: String,
) -> Result<StatusCode, AppError> {
    let request = client
        .post(&config.telegraf_url)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(line);

    super::send(request, config).await
}
