//! Middleware context types.
//!
//! The [`MiddlewareContext`] is the per-request scope object every stage
//! receives. It is created once per request and dropped when the request
//! completes; nothing in it is shared across requests.

use argus_core::CorrelationContext;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

/// Context that flows through the middleware pipeline.
///
/// The correlation identity is write-once: the first call to
/// [`set_correlation`](Self::set_correlation) wins and later calls are
/// ignored.
///
/// # Example
///
/// ```
/// use argus_core::CorrelationContext;
/// use argus_middleware::context::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// assert!(ctx.correlation().is_none());
///
/// let first = CorrelationContext::from_inbound(Some("abc-123"));
/// assert!(ctx.set_correlation(first.clone()));
/// assert!(!ctx.set_correlation(CorrelationContext::generate()));
/// assert_eq!(ctx.correlation(), Some(&first));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Trace and request IDs, once established.
    correlation: Option<CorrelationContext>,

    /// Peer address reported by the transport.
    remote_addr: Option<SocketAddr>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation: None,
            remote_addr: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Returns the peer address, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the correlation identity, if established.
    #[must_use]
    pub fn correlation(&self) -> Option<&CorrelationContext> {
        self.correlation.as_ref()
    }

    /// Establishes the correlation identity.
    ///
    /// Returns `false` and leaves the existing identity untouched if one was
    /// already set.
    pub fn set_correlation(&mut self, correlation: CorrelationContext) -> bool {
        if self.correlation.is_some() {
            return false;
        }
        self.correlation = Some(correlation);
        true
    }

    /// Returns the correlation identity, generating one if none was set.
    ///
    /// Lets stages run correctly when the tracer is not installed.
    pub fn ensure_correlation(&mut self) -> &CorrelationContext {
        self.correlation
            .get_or_insert_with(CorrelationContext::generate)
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use argus_middleware::context::MiddlewareContext;
    ///
    /// struct TenantId(&'static str);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(TenantId("acme"));
    /// assert_eq!(ctx.get_extension::<TenantId>().unwrap().0, "acme");
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_is_write_once() {
        let mut ctx = MiddlewareContext::new();
        let first = CorrelationContext::from_inbound(Some("t-1"));
        assert!(ctx.set_correlation(first.clone()));
        assert!(!ctx.set_correlation(CorrelationContext::from_inbound(Some("t-2"))));
        assert_eq!(ctx.correlation().unwrap().trace_id().as_str(), "t-1");
    }

    #[test]
    fn test_ensure_correlation_generates_once() {
        let mut ctx = MiddlewareContext::new();
        let generated = ctx.ensure_correlation().clone();
        assert_eq!(ctx.ensure_correlation(), &generated);
        assert_eq!(ctx.correlation(), Some(&generated));
    }

    #[test]
    fn test_remote_addr() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let ctx = MiddlewareContext::new().with_remote_addr(addr);
        assert_eq!(ctx.remote_addr(), Some(addr));
        assert!(MiddlewareContext::new().remote_addr().is_none());
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct MyExtension {
            value: i32,
        }

        let mut ctx = MiddlewareContext::new();
        assert!(!ctx.has_extension::<MyExtension>());

        ctx.set_extension(MyExtension { value: 42 });
        assert_eq!(ctx.get_extension::<MyExtension>(), Some(&MyExtension { value: 42 }));

        let removed = ctx.remove_extension::<MyExtension>();
        assert_eq!(removed, Some(MyExtension { value: 42 }));
        assert!(!ctx.has_extension::<MyExtension>());
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = MiddlewareContext::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed() >= std::time::Duration::from_millis(10));
    }
}
