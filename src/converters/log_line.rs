//! logfmt-style encoding of a single log line
//!
//! The level is not part of the line, it becomes a stream label instead.

use crate::models::{KvMap, LogEntry, Precision, Scalar, Timestamp};

/// Key the message is written under
pub const MESSAGE_KEY: &str = "msg";

/// Loki wants nanoseconds. Millisecond values get six zeros appended as
/// text, so no precision is lost and leading zeros survive.
pub fn normalize_timestamp(timestamp: &Timestamp) -> String {
    match timestamp.precision {
        Precision::Ms => format!("{}000000", timestamp.value),
        Precision::Ns => timestamp.value.clone(),
    }
}

/// Encode one entry into `(nanosecond timestamp, line)`
///
/// Common pairs come first, then per-line pairs, then `msg` if the entry has
/// a message. A per-line key that shadows a common key replaces its value in
/// place. Undefined values are dropped before merging.
pub fn encode(common: &KvMap, entry: &LogEntry) -> (String, String) {
    let mut pairs = KvMap::new();
    for (k, v) in common.defined().chain(entry.kv.defined()) {
        pairs.insert(k, Some(v.clone()));
    }
    if let Some(message) = &entry.message {
        pairs.insert(MESSAGE_KEY, Some(Scalar::String(message.clone())));
    }

    let line = pairs
        .defined()
        .map(|(k, v)| render_pair(k, v))
        .collect::<Vec<_>>()
        .join(" ");

    (normalize_timestamp(&entry.timestamp), line)
}

fn render_pair(key: &str, value: &Scalar) -> String {
    match value {
        Scalar::String(s) => format!("{}=\"{}\"", key, s),
        other => format!("{}={}", key, other),
    }
}
