//! Loki push format
//!
//! https://grafana.com/docs/loki/latest/reference/api/#push-log-entries-to-loki
//!
//! Labels are only used for things that have a finite set of values
//! (environment, service, level); everything else goes into the line.

use serde::Serialize;

use super::log_line;
use crate::models::{Environment, LogBatch, LogEntry, LogLevel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPayload {
    pub streams: Vec<Stream>,
}

impl PushPayload {
    /// Total number of lines across all streams
    pub fn line_count(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stream {
    pub stream: StreamLabels,
    /// `[nanosecond timestamp, line]` pairs
    pub values: Vec<(String, String)>,
}

/// Label set of a stream, serialized in this field order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamLabels {
    pub environment: Environment,
    pub service: String,
    pub level: LogLevel,
}

/// Group a batch into one stream per level
///
/// Streams appear in the order their level is first seen, and lines keep
/// their relative order within a stream.
pub fn batch(batch: &LogBatch) -> PushPayload {
    let mut buckets: Vec<(LogLevel, Vec<&LogEntry>)> = Vec::new();
    for entry in &batch.logs {
        match buckets.iter_mut().find(|(level, _)| *level == entry.level) {
            Some((_, entries)) => entries.push(entry),
            None => buckets.push((entry.level, vec![entry])),
        }
    }

    let streams = buckets
        .into_iter()
        .map(|(level, entries)| Stream {
            stream: StreamLabels {
                environment: batch.environment,
                service: batch.service.clone(),
                level,
            },
            values: entries
                .into_iter()
                .map(|entry| log_line::encode(&batch.kv, entry))
                .collect(),
        })
        .collect();

    PushPayload { streams }
}
