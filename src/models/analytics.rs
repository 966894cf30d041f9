use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::common::{Environment, KvMap, ValidationError};
use super::metric::{MetricEvent, MetricKind};
use crate::visitor;

/// Client-side analytics ping as accepted by the `/a` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    PageView {
        #[serde(default)]
        environment: Environment,
        path: String,
    },
}

/// Request metadata the analytics pipeline derives fields from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientContext {
    /// `Origin` header
    pub origin: String,
    /// `CF-Connecting-IP` header
    pub ip: String,
    /// `User-Agent` header
    pub user_agent: String,
    /// `CF-IPCountry` header, `None` when absent
    pub country: Option<String>,
}

impl ClientContext {
    pub fn location(&self) -> &str {
        self.country.as_deref().unwrap_or("unknown")
    }
}

impl AnalyticsEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::PageView { path, .. } if path.is_empty() => Err(ValidationError::EmptyField("path")),
            Self::PageView { .. } => Ok(()),
        }
    }

    /// Analytics are just a special kind of metric: reshape into one, deriving
    /// the service from the origin and the visitor id from client metadata.
    pub fn to_metric(&self, client: &ClientContext, today: NaiveDate) -> MetricEvent {
        match self {
            Self::PageView { environment, path } => {
                let visitor = visitor::visitor_id(
                    today,
                    &client.origin,
                    &client.ip,
                    &client.user_agent,
                );

                let mut fields = KvMap::new();
                fields.insert("visitor", Some(visitor.into()));
                fields.insert("location", Some(client.location().into()));

                MetricEvent {
                    service: visitor::service_from_origin(&client.origin),
                    environment: *environment,
                    kind: MetricKind::PageView {
                        path: path.clone(),
                        fields,
                    },
                }
            }
        }
    }
}
