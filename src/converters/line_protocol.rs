//! InfluxDB Line Protocol encoding
//!
//! https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/
//!
//! Tags are indexed by InfluxDB, fields are not. Tags are only used for data
//! with a known set of possible values. Nothing is escaped, callers pass
//! values free of commas, spaces and equals signs.

use crate::models::{KvMap, MetricEvent, MetricKind};

/// Bucket every metric point is written to
pub const METRICS_BUCKET: &str = "metrics";

/// Ordered tag set
pub type Tags = Vec<(String, String)>;

/// Encode one point as `measurement,tags fields timestamp`
///
/// Tags keep the order the caller supplied. String fields are quoted,
/// numbers and booleans are bare, undefined fields are skipped.
pub fn encode(measurement: &str, tags: &[(String, String)], fields: &KvMap, timestamp_millis: i64) -> String {
    let t = tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    let f = fields
        .defined()
        .map(|(k, v)| {
            if v.is_string() {
                format!("{}=\"{}\"", k, v)
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    format!("{},{} {} {}", measurement, t, f, timestamp_millis)
}

/// Canonical tag set for a metric: bucket, environment, service, then the
/// kind-specific tags in declaration order
pub fn metric_tags(event: &MetricEvent) -> Tags {
    let mut tags = vec![
        ("bucket".to_string(), METRICS_BUCKET.to_string()),
        ("environment".to_string(), event.environment.to_string()),
        ("service".to_string(), event.service.clone()),
    ];

    match &event.kind {
        MetricKind::PageView { path, .. } => {
            tags.push(("path".to_string(), path.clone()));
        }
        MetricKind::Request {
            method,
            path,
            status,
            ..
        } => {
            tags.push(("method".to_string(), method.clone()));
            tags.push(("path".to_string(), path.clone()));
            tags.push(("status".to_string(), status.to_string()));
        }
    }

    tags
}

/// Encode a metric event at the given time
pub fn encode_metric(event: &MetricEvent, timestamp_millis: i64) -> String {
    encode(
        event.kind.measurement(),
        &metric_tags(event),
        event.kind.fields(),
        timestamp_millis,
    )
}
