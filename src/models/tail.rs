//! Platform invocation trace items, as delivered to a tail consumer

use serde::Deserialize;
use serde_json::{Map, Value};

use super::common::{KvMap, Scalar};
use crate::error::TranslationError;

/// One platform invocation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailItem {
    #[serde(default)]
    pub script_name: Option<String>,
    /// Invocation start, in milliseconds
    #[serde(default)]
    pub event_timestamp: Option<u64>,
    #[serde(default)]
    pub outcome: String,
    /// Trigger description; its keys determine the trigger kind
    #[serde(default)]
    pub event: Option<Map<String, Value>>,
    #[serde(default)]
    pub logs: Vec<TailLog>,
    #[serde(default)]
    pub exceptions: Vec<TailException>,
}

/// A console call made during the invocation
#[derive(Debug, Clone, Deserialize)]
pub struct TailLog {
    pub level: String,
    /// Positional console arguments
    #[serde(default)]
    pub message: Vec<Value>,
    pub timestamp: u64,
}

/// An uncaught exception raised during the invocation
#[derive(Debug, Clone, Deserialize)]
pub struct TailException {
    #[serde(default)]
    pub name: String,
    pub message: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct RequestEvent {
    url: String,
    method: String,
}

/// What started the invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Request { url: String, method: String },
    Cron,
    Scheduled,
    Queue,
    Email,
}

impl Trigger {
    /// Classify a trace item event by the key it carries
    pub fn classify(event: &Map<String, Value>) -> Result<Self, TranslationError> {
        if let Some(request) = event.get("request") {
            let request: RequestEvent = serde_json::from_value(request.clone())
                .map_err(TranslationError::MalformedRequest)?;
            return Ok(Self::Request {
                url: request.url,
                method: request.method,
            });
        }

        if event.contains_key("cron") {
            Ok(Self::Cron)
        } else if event.contains_key("scheduledTime") {
            Ok(Self::Scheduled)
        } else if event.contains_key("queue") {
            Ok(Self::Queue)
        } else if event.contains_key("mailFrom") {
            Ok(Self::Email)
        } else {
            Err(TranslationError::UnrecognizedEventSource)
        }
    }
}

/// Decoded console arguments
///
/// Logs come in two shapes:
/// 1. message only: `console.log("Some string", extra)`
/// 2. kv + message: `console.log({ foo: "bar" }, "Some string", extra)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleArgs {
    pub first_arg_is_map: bool,
    pub kv: KvMap,
    pub tokens: Vec<String>,
}

impl ConsoleArgs {
    pub fn decode(args: &[Value]) -> Self {
        match args.split_first() {
            Some((Value::Object(first), rest)) => {
                let mut kv = KvMap::new();
                for (key, value) in first {
                    kv.insert(key.clone(), Some(kv_value(value)));
                }
                Self {
                    first_arg_is_map: true,
                    kv,
                    tokens: rest.iter().map(token).collect(),
                }
            }
            _ => Self {
                first_arg_is_map: false,
                kv: KvMap::new(),
                tokens: args.iter().map(token).collect(),
            },
        }
    }

    pub fn message(&self) -> String {
        self.tokens.join(" ")
    }
}

// Scalars are kept as-is, anything else is flattened to its JSON text
fn kv_value(value: &Value) -> Scalar {
    match value {
        Value::String(s) => Scalar::String(s.clone()),
        Value::Number(n) => Scalar::Number(n.clone()),
        Value::Bool(b) => Scalar::Bool(*b),
        other => Scalar::String(other.to_string()),
    }
}

fn token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
