//! Request metrics and structured logging for Argus.
//!
//! - **Aggregation**: [`MetricsAggregator`] keeps process-wide request
//!   counters with a bounded response-time window
//! - **Exposition**: an aggregator snapshot collected into `prometheus`
//!   families and rendered by its `TextEncoder` (format version 0.0.4)
//! - **Logging**: `tracing-subscriber` setup plus the [`LogRecord`] model
//!   and [`LogSink`] implementations used by the request logger
//! - **Facade**: the same events mirrored to the `metrics` crate;
//!   [`metrics::init_metrics`] installs a Prometheus recorder for them
//!
//! # Exposition
//!
//! ```text
//! # HELP http_errors_total Total number of HTTP errors by status code
//! # TYPE http_errors_total counter
//! http_errors_total{status="404"} 12
//! # HELP http_requests_by_method_total Total number of HTTP requests by method
//! # TYPE http_requests_by_method_total counter
//! http_requests_by_method_total{method="GET"} 1200
//! http_requests_by_method_total{method="POST"} 34
//! # HELP http_requests_total Total number of HTTP requests
//! # TYPE http_requests_total counter
//! http_requests_total 1234
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use argus_core::RuntimeMode;
//! use argus_telemetry::{init_telemetry, LogConfig, MetricsAggregator};
//!
//! init_telemetry(&LogConfig::for_mode(RuntimeMode::Production))?;
//! let metrics = Arc::new(MetricsAggregator::new());
//! ```

#![doc(html_root_url = "https://docs.rs/argus-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregator;
pub mod error;
pub mod exposition;
pub mod logging;
pub mod metrics;
pub mod record;

pub use aggregator::{MetricsAggregator, MetricsReport, MetricsSnapshot, RESPONSE_TIME_WINDOW};
pub use error::TelemetryError;
pub use exposition::{SnapshotCollector, CONTENT_TYPE as EXPOSITION_CONTENT_TYPE};
pub use logging::{init_logging, LogConfig};
pub use record::{LogPhase, LogRecord, LogSink, MemorySink, TracingSink};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs the log subscriber and registers facade metric descriptions.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidConfig`] for an empty level and
/// [`TelemetryError::LoggingInit`] if the subscriber cannot be installed.
pub fn init_telemetry(config: &LogConfig) -> TelemetryResult<()> {
    if config.enabled && config.level.trim().is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "log level must not be empty".to_string(),
        ));
    }
    init_logging(config)?;
    crate::metrics::describe_metrics();
    Ok(())
}
