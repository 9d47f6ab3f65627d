//! The standard pipeline stages.
//!
//! Listed outermost first:
//!
//! 1. [`request_tracer`] - Establish and propagate the correlation identity
//! 2. [`request_logger`] - Lifecycle records with sanitized bodies
//! 3. [`metrics_recorder`] - Counters and response times
//! 4. [`error_renderer`] - Failures become JSON error envelopes

pub mod error_renderer;
pub mod metrics_recorder;
pub mod request_logger;
pub mod request_tracer;

pub use error_renderer::{stamp_correlation, ErrorEnvelope, FailureReport, ResponseErrorRenderer};
pub use metrics_recorder::MetricsRecorder;
pub use request_logger::{sanitize_body, RequestLogger, REDACTED, SENSITIVE_FIELDS};
pub use request_tracer::RequestTracer;
