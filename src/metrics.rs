use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe all metrics
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "ingest_requests_total",
        "Total number of ingestion requests by route and outcome"
    );
    describe_counter!(
        "ingest_shipments_total",
        "Total number of payloads shipped to a backend"
    );
    describe_counter!(
        "ingest_log_lines_total",
        "Total number of log lines shipped to Loki"
    );
    describe_counter!(
        "ingest_tail_translation_failures_total",
        "Trace items that could not be translated"
    );
    describe_gauge!(
        "ingest_gateway_info",
        "Gateway version and build information"
    );

    gauge!("ingest_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record an inbound request, `outcome` being `accepted` or an error type name
pub fn record_request(route: &str, outcome: &str) {
    counter!(
        "ingest_requests_total",
        "route" => route.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Record a shipment attempt, `outcome` being `success` or an error type name
pub fn record_shipment(backend: &str, outcome: &str) {
    counter!(
        "ingest_shipments_total",
        "backend" => backend.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

pub fn record_log_lines(level: &str, count: u64) {
    counter!("ingest_log_lines_total", "level" => level.to_string()).increment(count);
}

pub fn record_tail_failure() {
    counter!("ingest_tail_translation_failures_total").increment(1);
}
