//! Core middleware trait and types.
//!
//! Every stage implements [`Middleware`]. A stage receives the per-request
//! context, the request, and a [`Next`] it invokes at most once. Stages
//! return an [`Outcome`]: either a response or the [`Failure`] that ended the
//! request, so failures travel as values rather than as panics.
//!
//! [`Failure`]: argus_core::Failure
//!
//! # Example
//!
//! ```
//! use argus_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Outcome, Request};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Outcome> {
//!         Box::pin(async move {
//!             let outcome = next.run(ctx, request).await;
//!             tracing::debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "done");
//!             outcome
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Outcome, Request};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The terminal request handler.
///
/// Handlers read the context (for example the correlation identity) and
/// return a future that owns everything it needs.
pub type Handler<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Outcome> + Send + 'a>;

/// The core middleware trait.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once
/// - A stage does not swallow a failure unless it renders it
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage.
    fn name(&self) -> &'static str;

    /// Processes the request through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome>;
}

/// Callback to invoke the rest of the chain.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Handler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke `middleware`, then `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Outcome> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    ///
    /// Consumes `self`, so it can only be called once.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Outcome {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}
