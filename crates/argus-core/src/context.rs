//! Correlation identity types.
//!
//! Every request carries exactly one [`CorrelationContext`]. It is created
//! once at request entry and never mutated afterwards; later stages receive
//! it by reference or as a cheap clone.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the cross-service trace ID (inbound and outbound).
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Header carrying the per-hop request ID (outbound only).
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A unique identifier for one hop's handling of one request, using UUID v4.
///
/// Request IDs are never inherited from callers.
///
/// # Example
///
/// ```
/// use argus_core::RequestId;
///
/// let a = RequestId::new();
/// let b = RequestId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// An opaque identifier correlating one logical operation across hops.
///
/// A trace ID is either inherited verbatim from the inbound `x-trace-id`
/// header or freshly generated. Inherited values are client-supplied and are
/// not required to be UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generates a fresh trace ID (a hyphenated UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an inherited trace ID, keeping the value byte for byte.
    ///
    /// Returns `None` for empty or whitespace-only values so callers fall
    /// back to generation.
    #[must_use]
    pub fn inherit(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    /// Returns the trace ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request correlation identity.
///
/// # Example
///
/// ```
/// use argus_core::CorrelationContext;
///
/// let ctx = CorrelationContext::from_inbound(Some("abc-123"));
/// assert_eq!(ctx.trace_id().as_str(), "abc-123");
/// assert_ne!(ctx.request_id().to_string(), "abc-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationContext {
    trace_id: TraceId,
    request_id: RequestId,
}

impl CorrelationContext {
    /// Creates a context from explicit parts.
    #[must_use]
    pub const fn new(trace_id: TraceId, request_id: RequestId) -> Self {
        Self {
            trace_id,
            request_id,
        }
    }

    /// Creates a context with a fresh trace ID and request ID.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(TraceId::generate(), RequestId::new())
    }

    /// Creates a context from the inbound `x-trace-id` value, if any.
    ///
    /// The trace ID is inherited when present and non-empty. The request ID
    /// is always fresh.
    #[must_use]
    pub fn from_inbound(trace_header: Option<&str>) -> Self {
        let trace_id = trace_header
            .and_then(TraceId::inherit)
            .unwrap_or_else(TraceId::generate);
        Self::new(trace_id, RequestId::new())
    }

    /// Returns the trace ID.
    #[must_use]
    pub const fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }
}
