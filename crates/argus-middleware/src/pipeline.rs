//! Fixed-order middleware pipeline.
//!
//! ## Pipeline Stages
//!
//! The standard pipeline has 4 stages in a fixed order:
//!
//! 1. **Request Tracer** - Establish trace and request IDs
//! 2. **Request Logger** - Incoming / completed / failed records
//! 3. **Metrics Recorder** - Counters and response times
//! 4. **Response Error Renderer** - Failures become JSON envelopes
//!
//! A failure that reaches the pipeline boundary unrendered (for example in
//! a pipeline built without the renderer) is rendered there with the
//! production-safe renderer, so every response carries the correlation
//! headers and every failure the envelope.

use std::sync::Arc;

use argus_core::RuntimeMode;
use argus_telemetry::{LogSink, MetricsAggregator};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::error_renderer::{request_target, stamp_correlation};
use crate::stages::{MetricsRecorder, RequestLogger, RequestTracer, ResponseErrorRenderer};
use crate::types::{Outcome, Request, Response};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered middleware pipeline.
///
/// The order is fixed once built.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use argus_core::RuntimeMode;
/// use argus_middleware::Pipeline;
/// use argus_telemetry::{MetricsAggregator, TracingSink};
///
/// let pipeline = Pipeline::standard(
///     RuntimeMode::Production,
///     Arc::new(MetricsAggregator::new()),
///     Arc::new(TracingSink),
/// );
/// assert_eq!(
///     pipeline.stage_names(),
///     ["request_tracer", "request_logger", "metrics_recorder", "response_error_renderer"]
/// );
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Assembles the standard four-stage pipeline.
    #[must_use]
    pub fn standard(
        mode: RuntimeMode,
        aggregator: Arc<MetricsAggregator>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self::builder()
            .stage(RequestTracer::new())
            .stage(RequestLogger::new(sink, mode))
            .stage(MetricsRecorder::new(aggregator, mode))
            .stage(ResponseErrorRenderer::new(mode))
            .build()
    }

    /// Processes a request through every stage and the handler.
    pub async fn process<H>(&self, mut ctx: MiddlewareContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Outcome> + Send,
    {
        let method = request.method().to_string();
        let path = request_target(&request);

        let next = self.build_chain(handler);
        match next.run(&mut ctx, request).await {
            Ok(response) => response,
            Err(failure) => {
                let correlation = ctx.ensure_correlation().clone();
                let (mut response, _) =
                    ResponseErrorRenderer::production().render(&failure, &correlation, &method, &path);
                stamp_correlation(&mut response, &correlation);
                response
            }
        }
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Outcome> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage. Stages run outermost first, in insertion order.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// The stages of the standard pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: correlation identity
    RequestTracer = 1,
    /// Stage 2: lifecycle logging
    RequestLogger = 2,
    /// Stage 3: metrics recording
    MetricsRecorder = 3,
    /// Stage 4: error envelope rendering
    ResponseErrorRenderer = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RequestTracer => "request_tracer",
            Self::RequestLogger => "request_logger",
            Self::MetricsRecorder => "metrics_recorder",
            Self::ResponseErrorRenderer => "response_error_renderer",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::RequestTracer,
            Self::RequestLogger,
            Self::MetricsRecorder,
            Self::ResponseErrorRenderer,
        ]
    }
}
