pub mod analytics;
pub mod common;
pub mod log;
pub mod metric;
pub mod tail;

pub use analytics::{AnalyticsEvent, ClientContext};
pub use common::{Environment, KvMap, Scalar, ValidationError};
pub use log::{LogBatch, LogEntry, LogLevel, Precision, Timestamp};
pub use metric::{MetricEvent, MetricKind};
pub use tail::{ConsoleArgs, TailItem, Trigger};
