//! Translation of platform trace items into log batches
//!
//! A tail consumer cannot be tailed itself, so translation failures are not
//! raised: they become a fatal log line shipped under the gateway's own
//! service name, the same way any other service's logs are.

use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DoubleFaultError, TranslationError};
use crate::models::{
    ConsoleArgs, Environment, KvMap, LogBatch, LogEntry, LogLevel, TailItem, Timestamp, Trigger,
};

/// Environment every translated invocation is reported under
pub const TAIL_ENVIRONMENT: Environment = Environment::Production;

/// Message used when even reporting a failure fails
pub const DOUBLE_FAULT_MESSAGE: &str = "Failed to report tail translation failure";

/// Turn one invocation into its log entries: the incoming request (request
/// triggers only), console lines, exceptions, then a fatal outcome line for
/// request triggers that did not end `ok`.
pub fn translate(item: &TailItem) -> Result<Vec<LogEntry>, TranslationError> {
    if item.script_name.is_none() {
        return Err(TranslationError::MissingScriptName);
    }
    let event_timestamp = item
        .event_timestamp
        .ok_or(TranslationError::MissingEventTimestamp)?;
    let event = item.event.as_ref().ok_or(TranslationError::MissingEvent)?;

    let trigger = Trigger::classify(event)?;
    let mut entries = Vec::with_capacity(item.logs.len() + item.exceptions.len() + 2);

    // Only request triggers get the incoming request and outcome lines
    if let Trigger::Request { url, method } = &trigger {
        let parsed = url::Url::parse(url).map_err(|source| TranslationError::InvalidRequestUrl {
            url: url.clone(),
            source,
        })?;

        let mut kv = KvMap::new();
        kv.insert("path", Some(parsed.path().into()));
        kv.insert("method", Some(method.as_str().into()));

        entries.push(
            LogEntry::new(LogLevel::Info, Timestamp::millis(event_timestamp), "Incoming request")
                .with_kv(kv),
        );
    }

    for log in &item.logs {
        let args = ConsoleArgs::decode(&log.message);
        entries.push(LogEntry {
            level: LogLevel::from_console(&log.level),
            timestamp: Timestamp::millis(log.timestamp),
            message: Some(args.message()),
            kv: args.kv,
        });
    }

    for exception in &item.exceptions {
        entries.push(LogEntry::new(
            LogLevel::Error,
            Timestamp::millis(exception.timestamp),
            exception.message.clone(),
        ));
    }

    if matches!(trigger, Trigger::Request { .. }) && item.outcome != "ok" {
        let mut kv = KvMap::new();
        kv.insert("outcome", Some(item.outcome.as_str().into()));
        entries.push(
            LogEntry::new(LogLevel::Fatal, Timestamp::millis(event_timestamp), "Fatal outcome")
                .with_kv(kv),
        );
    }

    Ok(entries)
}

/// Parse and translate one raw trace item into the batch to ship for it
pub fn translate_value(raw: Value) -> Result<LogBatch, TranslationError> {
    let item: TailItem = serde_json::from_value(raw).map_err(TranslationError::MalformedItem)?;
    let logs = translate(&item)?;

    Ok(LogBatch {
        service: item.script_name.unwrap_or_default(),
        environment: TAIL_ENVIRONMENT,
        kv: KvMap::new(),
        logs,
    })
}

/// Translate one raw trace item, replacing any failure with a report batch.
/// Never fails.
pub fn translate_or_report(raw: Value, self_service: &str) -> LogBatch {
    match translate_value(raw) {
        Ok(batch) => batch,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to translate trace item");
            crate::metrics::record_tail_failure();
            failure_report(&err, self_service)
        }
    }
}

/// Batch carrying a single fatal line describing `err`
pub fn failure_report(err: &TranslationError, self_service: &str) -> LogBatch {
    failure_report_at(err, self_service, SystemTime::now())
}

fn failure_report_at(err: &TranslationError, self_service: &str, now: SystemTime) -> LogBatch {
    let entry = match failure_entry(err, now) {
        Ok(entry) => entry,
        Err(double_fault) => {
            tracing::error!(error = %double_fault, "Failed to build translation failure report");
            static_failure_entry()
        }
    };

    LogBatch {
        service: self_service.to_string(),
        environment: TAIL_ENVIRONMENT,
        kv: KvMap::new(),
        logs: vec![entry],
    }
}

fn failure_entry(err: &TranslationError, now: SystemTime) -> Result<LogEntry, DoubleFaultError> {
    let millis = now.duration_since(UNIX_EPOCH)?.as_millis();

    let mut kv = KvMap::new();
    kv.insert("name", Some(err.name().into()));
    kv.insert("stack", Some(err.stack().into()));

    Ok(LogEntry {
        level: LogLevel::Fatal,
        timestamp: Timestamp {
            precision: crate::models::Precision::Ms,
            value: millis.to_string(),
        },
        message: Some(err.to_string()),
        kv,
    })
}

fn static_failure_entry() -> LogEntry {
    LogEntry::new(LogLevel::Fatal, Timestamp::millis(0), DOUBLE_FAULT_MESSAGE)
}
