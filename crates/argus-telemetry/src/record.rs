//! Request lifecycle log records and sinks.
//!
//! A [`LogRecord`] is built by the request logger and handed to a
//! [`LogSink`] immediately. Nothing keeps records after emission except
//! [`MemorySink`], which exists for assertions in tests.

use argus_core::CorrelationContext;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// Lifecycle phase of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogPhase {
    /// Request entered the pipeline.
    Incoming,
    /// Handler produced a response.
    Completed,
    /// Handler failed or the request was abandoned.
    Failed,
}

/// One structured lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Lifecycle phase.
    pub phase: LogPhase,
    /// Trace ID.
    pub trace_id: String,
    /// Request ID.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Peer address, when the transport reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    /// `User-Agent` header, when present (incoming only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Response status (completed and failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Elapsed milliseconds (completed and failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Sanitized request body (incoming only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Failure message (failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Failure stack or cause chain (failed only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl LogRecord {
    /// Creates an `Incoming` record.
    #[must_use]
    pub fn incoming(
        correlation: &CorrelationContext,
        method: impl Into<String>,
        path: impl Into<String>,
        remote_address: Option<String>,
    ) -> Self {
        Self {
            phase: LogPhase::Incoming,
            trace_id: correlation.trace_id().to_string(),
            request_id: correlation.request_id().to_string(),
            method: method.into(),
            path: path.into(),
            remote_address,
            user_agent: None,
            status_code: None,
            duration_ms: None,
            body: None,
            error_message: None,
            stack: None,
        }
    }

    /// Attaches the caller's user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Attaches a sanitized body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Derives the `Completed` record for the same request.
    #[must_use]
    pub fn completed(&self, status_code: u16, duration_ms: f64) -> Self {
        Self {
            phase: LogPhase::Completed,
            status_code: Some(status_code),
            duration_ms: Some(duration_ms),
            user_agent: None,
            body: None,
            ..self.clone()
        }
    }

    /// Derives the `Failed` record for the same request.
    #[must_use]
    pub fn failed(
        &self,
        status_code: u16,
        duration_ms: f64,
        error_message: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        Self {
            phase: LogPhase::Failed,
            status_code: Some(status_code),
            duration_ms: Some(duration_ms),
            user_agent: None,
            body: None,
            error_message: Some(error_message.into()),
            stack,
            ..self.clone()
        }
    }
}

/// Destination for lifecycle records.
///
/// Implementations must not block; emission is fire-and-forget relative to
/// the request.
pub trait LogSink: Send + Sync + 'static {
    /// Writes one record.
    fn emit(&self, record: &LogRecord);
}

/// Emits records as `tracing` events.
///
/// `Incoming` and `Completed` log at `info`; `Failed` logs at `error` with the
/// stack attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let body = record.body.as_ref().map(ToString::to_string);
        match record.phase {
            LogPhase::Incoming => tracing::info!(
                trace_id = %record.trace_id,
                request_id = %record.request_id,
                http.method = %record.method,
                http.path = %record.path,
                remote_addr = record.remote_address.as_deref(),
                user_agent = record.user_agent.as_deref(),
                body = body.as_deref(),
                "Incoming request"
            ),
            LogPhase::Completed => tracing::info!(
                trace_id = %record.trace_id,
                request_id = %record.request_id,
                http.method = %record.method,
                http.path = %record.path,
                http.status_code = record.status_code,
                duration_ms = record.duration_ms,
                "Request completed"
            ),
            LogPhase::Failed => tracing::error!(
                trace_id = %record.trace_id,
                request_id = %record.request_id,
                http.method = %record.method,
                http.path = %record.path,
                http.status_code = record.status_code,
                duration_ms = record.duration_ms,
                error = record.error_message.as_deref(),
                stack = record.stack.as_deref(),
                "Request failed"
            ),
        }
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record emitted so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns records for one request, in emission order.
    #[must_use]
    pub fn for_request(&self, request_id: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Drops every captured record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming() -> LogRecord {
        let correlation = CorrelationContext::from_inbound(Some("trace-1"));
        LogRecord::incoming(&correlation, "POST", "/users", Some("10.0.0.1:5000".to_string()))
            .with_user_agent("curl/8.0")
            .with_body(serde_json::json!({"name": "n"}))
    }

    #[test]
    fn test_completed_drops_body() {
        let done = incoming().completed(201, 12.5);
        assert_eq!(done.phase, LogPhase::Completed);
        assert_eq!(done.status_code, Some(201));
        assert!(done.body.is_none());
        assert!(done.user_agent.is_none());
        assert_eq!(done.trace_id, "trace-1");
    }

    #[test]
    fn test_failed_carries_error() {
        let failed = incoming().failed(500, 3.0, "boom", Some("at handler".to_string()));
        assert_eq!(failed.phase, LogPhase::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
        assert_eq!(failed.stack.as_deref(), Some("at handler"));
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let json = serde_json::to_value(incoming()).unwrap();
        assert_eq!(json["phase"], "incoming");
        assert_eq!(json["traceId"], "trace-1");
        assert_eq!(json["body"]["name"], "n");
        assert_eq!(json["userAgent"], "curl/8.0");
        assert!(json.get("statusCode").is_none());
        assert!(json.get("durationMs").is_none());
    }

    #[test]
    fn test_memory_sink_filters_by_request() {
        let sink = MemorySink::new();
        let first = incoming();
        let second = incoming();
        sink.emit(&first);
        sink.emit(&second);
        sink.emit(&first.completed(200, 1.0));

        let records = sink.for_request(&first.request_id);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].phase, LogPhase::Completed);

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_tracing_sink_emits_without_subscriber() {
        let record = incoming();
        TracingSink.emit(&record);
        TracingSink.emit(&record.failed(500, 1.0, "boom", None));
    }
}
