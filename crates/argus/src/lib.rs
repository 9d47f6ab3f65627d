//! # Argus
//!
//! **Request correlation, lifecycle logging, metrics and error envelopes**
//!
//! - 🔗 **Correlation** – `x-trace-id` inherited across hops, `x-request-id` per hop
//! - 📝 **Lifecycle Logs** – Incoming / completed / failed records with redacted bodies
//! - 📊 **Metrics** – Bounded in-process aggregation with Prometheus text exposition
//! - 🧯 **Error Envelopes** – Every failure becomes one stable JSON shape
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use argus::prelude::*;
//!
//! let config = ConfigLoader::new().with_env_prefix("ARGUS").load()?;
//! argus::init(&config)?;
//!
//! let aggregator = Arc::new(MetricsAggregator::new());
//! let pipeline = argus::standard_pipeline(&config, aggregator.clone(), Arc::new(TracingSink));
//!
//! let response = pipeline
//!     .process(MiddlewareContext::new(), request, |_ctx, _req| {
//!         Box::pin(async { Err(Failure::not_found("no such user")) })
//!     })
//!     .await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → RequestTracer → RequestLogger → MetricsRecorder → ResponseErrorRenderer → Handler
//! ```

#![doc(html_root_url = "https://docs.rs/argus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

// Re-export core types
pub use argus_core as core;

// Re-export telemetry types
pub use argus_telemetry as telemetry;

// Re-export middleware types
pub use argus_middleware as middleware;

// Re-export configuration types
pub use argus_config as config;

use argus_config::ArgusConfig;
use argus_middleware::{MetricsEndpoint, Pipeline};
use argus_telemetry::{LogSink, MetricsAggregator, TelemetryResult};

/// Installs the log subscriber described by `config`, and the Prometheus
/// `metrics` recorder when `metrics.install_recorder` is set.
///
/// # Errors
///
/// Fails if the log configuration is invalid, or a subscriber or recorder
/// is already installed.
pub fn init(config: &ArgusConfig) -> TelemetryResult<()> {
    argus_telemetry::init_telemetry(config.log_config())?;
    if config.metrics.install_recorder {
        argus_telemetry::metrics::init_metrics()?;
    }
    Ok(())
}

/// Assembles the standard pipeline for the configured mode.
#[must_use]
pub fn standard_pipeline(
    config: &ArgusConfig,
    aggregator: Arc<MetricsAggregator>,
    sink: Arc<dyn LogSink>,
) -> Pipeline {
    Pipeline::standard(config.mode, aggregator, sink)
}

/// Builds the metrics endpoint, or `None` when it is disabled.
#[must_use]
pub fn metrics_endpoint(
    config: &ArgusConfig,
    aggregator: Arc<MetricsAggregator>,
) -> Option<MetricsEndpoint> {
    if !config.metrics.enabled {
        return None;
    }
    let endpoint = MetricsEndpoint::new(aggregator);
    Some(match &config.metrics.api_key {
        Some(key) => endpoint.with_api_key(key.clone()),
        None => endpoint,
    })
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use argus::prelude::*;
/// ```
pub mod prelude {
    pub use argus_core::{
        ClassifiedError, ConstraintViolation, CorrelationContext, ErrorClassifier, Failure,
        RuntimeMode, REQUEST_ID_HEADER, TRACE_ID_HEADER,
    };

    pub use argus_telemetry::{
        LogConfig, LogRecord, LogSink, MemorySink, MetricsAggregator, TracingSink,
    };

    pub use argus_middleware::{
        BoxFuture, ErrorEnvelope, MetricsEndpoint, Middleware, MiddlewareContext, Next, Outcome,
        Pipeline, Request, Response, ResponseExt, Stage,
    };

    pub use argus_config::{ArgusConfig, ConfigError, ConfigLoader};
}
