use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{Environment, KvMap, ValidationError};

/// Severity of a log line, also the Loki stream label `level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Map a platform console level (`log`, `info`, `warn`, ...) onto a log level.
    /// Anything unknown is treated as `info`.
    pub fn from_console(level: &str) -> Self {
        match level {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "fatal" => Self::Fatal,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of a timestamp value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Ms,
    Ns,
}

/// Unix timestamp carried as an opaque digit string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(rename = "p", alias = "precision", default)]
    pub precision: Precision,
    #[serde(rename = "v", alias = "value")]
    pub value: String,
}

impl Timestamp {
    pub fn millis(value: u64) -> Self {
        Self {
            precision: Precision::Ms,
            value: value.to_string(),
        }
    }

    pub fn nanos(value: impl Into<String>) -> Self {
        Self {
            precision: Precision::Ns,
            value: value.into(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.value.is_empty() || !self.value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidTimestamp(self.value.clone()));
        }
        Ok(())
    }
}

/// One log line as accepted by the `/l` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub level: LogLevel,
    pub timestamp: Timestamp,
    /// Text content of the log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Metadata specific to this log line
    #[serde(default, skip_serializing_if = "KvMap::is_empty")]
    pub kv: KvMap,
}

impl LogEntry {
    pub fn new(level: LogLevel, timestamp: Timestamp, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp,
            message: Some(message.into()),
            kv: KvMap::new(),
        }
    }

    pub fn with_kv(mut self, kv: KvMap) -> Self {
        self.kv = kv;
        self
    }
}

/// A batch of log lines from one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    /// A unique identifier for the service sending logs
    pub service: String,
    #[serde(default)]
    pub environment: Environment,
    /// Common metadata to attach to every log line
    #[serde(default, skip_serializing_if = "KvMap::is_empty")]
    pub kv: KvMap,
    pub logs: Vec<LogEntry>,
}

impl LogBatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.logs.is_empty() {
            return Err(ValidationError::EmptyLogs);
        }
        for entry in &self.logs {
            entry.timestamp.validate()?;
        }
        Ok(())
    }
}
