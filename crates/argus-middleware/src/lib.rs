//! # Argus Middleware
//!
//! The fixed-order request pipeline for Argus.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → RequestTracer → RequestLogger → MetricsRecorder → ResponseErrorRenderer → Handler
//!                                                                                        ↓
//! Response ←──────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Stage | Middleware              | Purpose                                      |
//! |-------|-------------------------|----------------------------------------------|
//! | 1     | Request Tracer          | Inherit `x-trace-id`, mint `x-request-id`    |
//! | 2     | Request Logger          | Incoming / completed / failed records        |
//! | 3     | Metrics Recorder        | Request counts, response times, error counts |
//! | 4     | Response Error Renderer | Failure → JSON error envelope                |
//!
//! Handlers return `Result<Response, Failure>`. Only the renderer writes a
//! failure body; the stages outside it see the rendered response and a
//! [`FailureReport`] in the [`MiddlewareContext`].
//!
//! ## Example
//!
//! ```
//! use argus_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 4);
//! assert_eq!(stages[0].name(), "request_tracer");
//! assert_eq!(stages[3].name(), "response_error_renderer");
//! ```

#![doc(html_root_url = "https://docs.rs/argus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod endpoint;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use endpoint::{MetricsEndpoint, API_KEY_HEADER};
pub use middleware::{BoxFuture, Handler, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use stages::{
    ErrorEnvelope, FailureReport, MetricsRecorder, RequestLogger, RequestTracer,
    ResponseErrorRenderer,
};
pub use types::{Outcome, Request, Response, ResponseExt};
