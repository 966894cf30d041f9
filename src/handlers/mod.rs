pub mod analytics;
pub mod health;
pub mod logs;
pub mod metric;
pub mod metrics_handler;
pub mod ping;
pub mod tail;
pub mod traces;

use crate::{
    config::Config,
    converters::loki::PushPayload,
    error::{error_type_name, AppError},
    metrics, providers,
};
use arc_swap::ArcSwap;
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use tokio_util::task::TaskTracker;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    pub http_client: reqwest::Client,
    /// Background shipments, drained on shutdown
    pub shipments: TaskTracker,
}

impl AppState {
    pub fn new(config: Arc<ArcSwap<Config>>) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            shipments: TaskTracker::new(),
        }
    }

    /// Ship a line protocol record to Telegraf without waiting for it
    pub fn spawn_line(&self, line: String) {
        let backends = self.config.load().backends.clone();
        self.shipments.spawn(providers::ship_line(self.http_client.clone(), backends, line));
    }

    /// Ship each payload to Loki concurrently without waiting for them
    pub fn spawn_logs(&self, payloads: Vec<PushPayload>) {
        if payloads.is_empty() {
            return;
        }

        let client = self.http_client.clone();
        let backends = self.config.load().backends.clone();
        self.shipments.spawn(async move {
            let shipments = payloads
                .into_iter()
                .map(|payload| providers::ship_logs(client.clone(), backends.clone(), payload));
            futures::future::join_all(shipments).await;
        });
    }

    /// Close the tracker and wait up to `timeout` for in-flight shipments.
    /// Returns `false` if some were still pending when the timeout elapsed.
    pub async fn drain_shipments(&self, timeout: Duration) -> bool {
        self.shipments.close();
        let pending = self.shipments.len();
        if pending > 0 {
            tracing::info!(pending = pending, "Waiting for in-flight shipments");
        }

        match tokio::time::timeout(timeout, self.shipments.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    pending = self.shipments.len(),
                    "Timed out waiting for in-flight shipments"
                );
                false
            }
        }
    }
}

/// Deserialize a request body, treating anything that is not JSON as `{}`
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    let value = serde_json::from_slice::<Value>(body).unwrap_or_else(|_| Value::Object(Map::new()));
    Ok(serde_json::from_value(value)?)
}

/// Count the request under `route` and pass the result through
pub fn track(route: &str, result: Result<Response, AppError>) -> Result<Response, AppError> {
    let outcome = match &result {
        Ok(_) => "accepted",
        Err(err) => error_type_name(err),
    };
    metrics::record_request(route, outcome);
    result
}

/// Fallback for paths with no endpoint
pub async fn bad_route() -> AppError {
    AppError::BadRoute
}

/// Fallback for methods an endpoint does not accept
pub async fn bad_method() -> AppError {
    AppError::BadMethod
}
