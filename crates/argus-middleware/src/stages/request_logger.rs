//! Request lifecycle logging middleware.
//!
//! Emits one `Incoming` record when the request enters and exactly one
//! `Completed` or `Failed` record when it leaves, including when the request
//! future is dropped mid-flight.
//!
//! # Body Logging
//!
//! Bodies are logged only for `POST` and `PATCH`. JSON bodies have the
//! fields in [`SENSITIVE_FIELDS`] replaced with [`REDACTED`] at any depth;
//! other bodies are summarized by length.

use std::sync::Arc;
use std::time::Instant;

use argus_core::{ErrorClassifier, Failure, RuntimeMode};
use argus_telemetry::{LogRecord, LogSink};
use bytes::Bytes;
use http::header::USER_AGENT;
use http::Method;
use http_body_util::{BodyExt, Full};
use serde_json::Value;

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::error_renderer::{request_target, FailureReport},
    types::{Outcome, Request},
};

/// Field names whose values never reach the log sink.
pub const SENSITIVE_FIELDS: [&str; 5] = ["password", "token", "accessToken", "refreshToken", "secret"];

/// Replacement for sensitive values.
pub const REDACTED: &str = "[REDACTED]";

/// Middleware that writes lifecycle records to a [`LogSink`].
#[derive(Clone)]
pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
    mode: RuntimeMode,
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl RequestLogger {
    /// Creates a logger writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, mode: RuntimeMode) -> Self {
        Self { sink, mode }
    }

    fn classifier(&self) -> ErrorClassifier {
        ErrorClassifier::new(self.mode)
    }
}

/// Returns whether bodies of this method are logged.
#[must_use]
pub fn logs_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PATCH
}

/// Produces the loggable form of a request body.
///
/// Returns `None` for methods whose bodies are never logged and for empty
/// bodies.
#[must_use]
pub fn sanitize_body(method: &Method, body: &[u8]) -> Option<Value> {
    if !logs_body(method) || body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact(&mut value);
            Some(value)
        }
        Err(_) => Some(Value::String(format!("<{} bytes>", body.len()))),
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SENSITIVE_FIELDS.contains(&key.as_str()) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Owns the `Incoming` record from request entry until the request finishes.
///
/// Dropping it unfinished means the request was abandoned; the `Incoming`
/// record still goes out first if it had not been emitted yet.
struct InFlight<'s> {
    sink: &'s dyn LogSink,
    classifier: ErrorClassifier,
    incoming: Option<LogRecord>,
    announced: bool,
    started: Instant,
}

impl InFlight<'_> {
    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn attach_body(&mut self, body: Value) {
        self.incoming = self.incoming.take().map(|incoming| incoming.with_body(body));
    }

    fn announce(&mut self) {
        if let Some(incoming) = &self.incoming {
            if !std::mem::replace(&mut self.announced, true) {
                self.sink.emit(incoming);
            }
        }
    }

    fn finish(mut self, status: u16, failure: Option<&FailureReport>) {
        let duration_ms = self.elapsed_ms();
        let Some(incoming) = self.incoming.take() else {
            return;
        };
        let record = match failure {
            Some(report) => incoming.failed(
                report.status_code(),
                duration_ms,
                report.message.clone(),
                report.stack.clone(),
            ),
            None => incoming.completed(status, duration_ms),
        };
        self.sink.emit(&record);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.announce();
        let duration_ms = self.elapsed_ms();
        if let Some(incoming) = self.incoming.take() {
            let report = FailureReport::new(&Failure::ClientClosed, self.classifier);
            self.sink.emit(&incoming.failed(
                report.status_code(),
                duration_ms,
                report.message,
                None,
            ));
        }
    }
}

async fn buffer(request: Request) -> (Request, Bytes) {
    let (parts, body) = request.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    (Request::from_parts(parts, Full::new(bytes.clone())), bytes)
}

impl Middleware for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let correlation = ctx.ensure_correlation().clone();
            let method = request.method().clone();
            let remote = ctx.remote_addr().map(|addr| addr.to_string());

            let mut incoming =
                LogRecord::incoming(&correlation, method.as_str(), request_target(&request), remote);
            if let Some(agent) = request
                .headers()
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok())
            {
                incoming = incoming.with_user_agent(agent);
            }

            let mut in_flight = InFlight {
                sink: self.sink.as_ref(),
                classifier: self.classifier(),
                incoming: Some(incoming),
                announced: false,
                started: Instant::now(),
            };

            let request = if logs_body(&method) {
                let (request, bytes) = buffer(request).await;
                if let Some(body) = sanitize_body(&method, &bytes) {
                    in_flight.attach_body(body);
                }
                request
            } else {
                request
            };

            in_flight.announce();

            let outcome = next.run(ctx, request).await;
            match &outcome {
                Ok(response) => {
                    in_flight.finish(response.status().as_u16(), ctx.get_extension::<FailureReport>());
                }
                Err(failure) => {
                    let report = FailureReport::new(failure, self.classifier());
                    in_flight.finish(report.status_code(), Some(&report));
                }
            }
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use argus_telemetry::{LogPhase, MemorySink};
    use http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    fn logger() -> (RequestLogger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (RequestLogger::new(sink.clone(), RuntimeMode::Test), sink)
    }

    fn request(method: Method, body: &'static str) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/users?expand=1")
            .header(USER_AGENT, "curl/8.0")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[test]
    fn test_redacts_sensitive_fields() {
        let body = br#"{"password":"p","name":"n"}"#;
        let logged = sanitize_body(&Method::POST, body).unwrap();
        assert_eq!(logged, json!({"password": "[REDACTED]", "name": "n"}));
    }

    #[test]
    fn test_redacts_nested_fields() {
        let body = br#"{"auth":{"accessToken":"a","refreshToken":"r"},"items":[{"secret":"s","id":1}]}"#;
        let logged = sanitize_body(&Method::PATCH, body).unwrap();
        assert_eq!(
            logged,
            json!({
                "auth": {"accessToken": "[REDACTED]", "refreshToken": "[REDACTED]"},
                "items": [{"secret": "[REDACTED]", "id": 1}]
            })
        );
    }

    #[test]
    fn test_body_logged_only_for_mutating_methods() {
        let body = br#"{"password":"p"}"#;
        assert!(sanitize_body(&Method::GET, body).is_none());
        assert!(sanitize_body(&Method::DELETE, body).is_none());
        assert!(sanitize_body(&Method::PUT, body).is_none());
        assert!(sanitize_body(&Method::POST, b"").is_none());
    }

    #[test]
    fn test_non_json_body_is_summarized() {
        let logged = sanitize_body(&Method::POST, b"token=abc").unwrap();
        assert_eq!(logged, json!("<9 bytes>"));
    }

    #[tokio::test]
    async fn test_logs_incoming_then_completed() {
        let (logger, sink) = logger();
        let mut ctx = MiddlewareContext::new().with_remote_addr("10.0.0.7:4000".parse().unwrap());
        let next = Next::handler(|_ctx, req| {
            Box::pin(async move {
                let bytes = req.into_body().collect().await.unwrap().to_bytes();
                assert_eq!(&bytes[..], br#"{"password":"p","name":"n"}"#);
                Ok(Response::with_body(StatusCode::CREATED, "text/plain", "ok"))
            })
        });

        logger
            .process(&mut ctx, request(Method::POST, r#"{"password":"p","name":"n"}"#), next)
            .await
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, LogPhase::Incoming);
        assert_eq!(records[0].path, "/users?expand=1");
        assert_eq!(records[0].user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(records[0].remote_address.as_deref(), Some("10.0.0.7:4000"));
        assert_eq!(records[0].body, Some(json!({"password": "[REDACTED]", "name": "n"})));
        assert_eq!(records[1].phase, LogPhase::Completed);
        assert_eq!(records[1].status_code, Some(201));
        assert!(records[1].duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_raw_failure_logs_failed() {
        let (logger, sink) = logger();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(Failure::runtime("TypeError", "x is undefined")) })
        });

        let outcome = logger.process(&mut ctx, request(Method::GET, ""), next).await;
        assert!(outcome.is_err());

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].body.is_none());
        assert_eq!(records[1].phase, LogPhase::Failed);
        assert_eq!(records[1].status_code, Some(500));
        assert!(records[1].error_message.as_deref().unwrap().contains("x is undefined"));
    }

    #[tokio::test]
    async fn test_rendered_failure_logs_failed() {
        let (logger, sink) = logger();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|ctx, _req| {
            ctx.set_extension(FailureReport::new(
                &Failure::not_found("no such user"),
                ErrorClassifier::default(),
            ));
            Box::pin(async { Ok(Response::with_body(StatusCode::NOT_FOUND, "application/json", "{}")) })
        });

        logger
            .process(&mut ctx, request(Method::GET, ""), next)
            .await
            .unwrap();

        let records = sink.records();
        assert_eq!(records[1].phase, LogPhase::Failed);
        assert_eq!(records[1].status_code, Some(404));
    }

    #[tokio::test]
    async fn test_abandoned_request_logs_failed_once() {
        let (logger, sink) = logger();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(std::future::pending::<Outcome>()));

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            logger.process(&mut ctx, request(Method::GET, ""), next),
        )
        .await;
        assert!(result.is_err());

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].phase, LogPhase::Failed);
        assert_eq!(records[1].status_code, Some(499));
    }

    #[test]
    fn test_abandoned_before_announce_still_logs_incoming_first() {
        let sink = MemorySink::new();
        let correlation = argus_core::CorrelationContext::from_inbound(None);
        let mut in_flight = InFlight {
            sink: &sink,
            classifier: ErrorClassifier::new(RuntimeMode::Production),
            incoming: Some(LogRecord::incoming(&correlation, "POST", "/users", None)),
            announced: false,
            started: Instant::now(),
        };
        in_flight.attach_body(json!({"name": "n"}));
        drop(in_flight);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, LogPhase::Incoming);
        assert_eq!(records[0].body, Some(json!({"name": "n"})));
        assert_eq!(records[1].phase, LogPhase::Failed);
        assert_eq!(records[1].status_code, Some(499));
    }
}
