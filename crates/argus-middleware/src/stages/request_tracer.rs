//! Correlation identity middleware.
//!
//! The tracer is the outermost stage. It establishes the request's
//! [`CorrelationContext`] before anything else runs and stamps it onto the
//! response.
//!
//! ## Sources
//!
//! 1. **Trace ID**: inherited from the inbound `x-trace-id` header when
//!    present and non-empty, otherwise a fresh UUID v4
//! 2. **Request ID**: always a fresh UUID v4; an inbound `x-request-id` is
//!    ignored because it identifies the caller's hop, not this one
//!
//! ## Response Headers
//!
//! Both `x-trace-id` and `x-request-id` are set on every response, success
//! or failure.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::error_renderer::stamp_correlation;
use crate::types::{Outcome, Request};
use argus_core::{CorrelationContext, TRACE_ID_HEADER};

/// Middleware that establishes and propagates the correlation identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTracer;

impl RequestTracer {
    /// Creates a new tracer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Derives the correlation identity for an inbound request.
    #[must_use]
    pub fn correlate(request: &Request) -> CorrelationContext {
        let inbound = request
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        CorrelationContext::from_inbound(inbound)
    }
}

impl Middleware for RequestTracer {
    fn name(&self) -> &'static str {
        "request_tracer"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if !ctx.set_correlation(Self::correlate(&request)) {
                tracing::debug!("correlation already established, keeping existing identity");
            }
            let correlation = ctx.ensure_correlation().clone();

            let mut response = next.run(ctx, request).await?;
            stamp_correlation(&mut response, &correlation);
            Ok(response)
        })
    }
}
