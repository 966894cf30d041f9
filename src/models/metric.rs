use serde::{Deserialize, Serialize};

use super::common::{Environment, KvMap, ValidationError};

/// A metric point as accepted by the `/m` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// Service reporting the metric, e.g. `blob-city`
    pub service: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(flatten)]
    pub kind: MetricKind,
}

/// Metric payload, discriminated by `name`
///
/// Everything except `fields` ends up as a tag, so values must not contain
/// commas, spaces or equals signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum MetricKind {
    PageView {
        path: String,
        #[serde(default)]
        fields: KvMap,
    },
    Request {
        method: String,
        path: String,
        status: i64,
        #[serde(default)]
        fields: KvMap,
    },
}

impl MetricKind {
    /// Measurement name in the line protocol
    pub fn measurement(&self) -> &'static str {
        match self {
            Self::PageView { .. } => "page_view",
            Self::Request { .. } => "request",
        }
    }

    pub fn fields(&self) -> &KvMap {
        match self {
            Self::PageView { fields, .. } | Self::Request { fields, .. } => fields,
        }
    }
}

impl MetricEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service.is_empty() {
            return Err(ValidationError::EmptyField("service"));
        }
        Ok(())
    }
}
