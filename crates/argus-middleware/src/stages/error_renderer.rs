//! Error envelope rendering.
//!
//! The renderer is the innermost stage. It is the only place a failure
//! becomes a response body; stages outside it see a rendered response plus
//! a [`FailureReport`] in the context.
//!
//! # Pipeline Position
//!
//! ```text
//! RequestTracer → RequestLogger → MetricsRecorder → [ResponseErrorRenderer] → Handler
//! ```
//!
//! # Envelope
//!
//! ```json
//! {
//!   "statusCode": 400,
//!   "error": "Validation Error",
//!   "message": "Request validation failed",
//!   "validationErrors": ["email must be an email"],
//!   "traceId": "5f0c...",
//!   "requestId": "9b1e...",
//!   "timestamp": "2026-01-01T00:00:00.000Z",
//!   "path": "/users",
//!   "method": "POST"
//! }
//! ```
//!
//! `stack` is added only in development mode, and only for error-shaped
//! failures.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Outcome, Request, Response, ResponseExt},
};
use argus_core::{
    ClassifiedError, CorrelationContext, ErrorClassifier, ErrorMessage, Failure, RuntimeMode,
    REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
use chrono::{SecondsFormat, Utc};
use http::header::HeaderValue;
use serde::{Deserialize, Serialize};

/// Classification of the failure that ended a request, stored in the
/// context for outer stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// The classifier's verdict.
    pub classified: ClassifiedError,
    /// The failure's own description, for logs.
    pub message: String,
    /// Stack or cause chain, for logs.
    pub stack: Option<String>,
}

impl FailureReport {
    /// Classifies `failure` and captures its log detail.
    #[must_use]
    pub fn new(failure: &Failure, classifier: ErrorClassifier) -> Self {
        Self {
            classified: classifier.classify(failure),
            message: failure.to_string(),
            stack: failure.stack(),
        }
    }

    /// Returns the response status.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.classified.status_code()
    }
}

/// The client-visible failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// HTTP status.
    pub status_code: u16,
    /// Category label.
    pub error: String,
    /// Client-facing message(s).
    pub message: ErrorMessage,
    /// Field-level violations (validation failures only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
    /// Trace ID.
    pub trace_id: String,
    /// Request ID.
    pub request_id: String,
    /// Render time, ISO-8601.
    pub timestamp: String,
    /// Request path and query.
    pub path: String,
    /// HTTP method.
    pub method: String,
    /// Stack (development only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Converts failures into JSON error envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseErrorRenderer {
    mode: RuntimeMode,
}

impl ResponseErrorRenderer {
    /// Creates a renderer for the given mode.
    #[must_use]
    pub const fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }

    /// A renderer that never exposes schema detail or stacks.
    #[must_use]
    pub const fn production() -> Self {
        Self::new(RuntimeMode::Production)
    }

    /// Returns the classifier this renderer uses.
    #[must_use]
    pub const fn classifier(&self) -> ErrorClassifier {
        ErrorClassifier::new(self.mode)
    }

    /// Builds the envelope for a classified failure.
    #[must_use]
    pub fn envelope(
        &self,
        report: &FailureReport,
        correlation: &CorrelationContext,
        method: &str,
        path: &str,
    ) -> ErrorEnvelope {
        let stack = if self.mode.exposes_stack() {
            report.stack.clone()
        } else {
            None
        };
        ErrorEnvelope {
            status_code: report.status_code(),
            error: report.classified.category.clone(),
            message: report.classified.message.clone(),
            validation_errors: report.classified.validation_errors.clone(),
            trace_id: correlation.trace_id().to_string(),
            request_id: correlation.request_id().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: path.to_string(),
            method: method.to_string(),
            stack,
        }
    }

    /// Renders a failure into a response, logging its internal detail.
    ///
    /// Returns the response and the report outer stages consult.
    pub fn render(
        &self,
        failure: &Failure,
        correlation: &CorrelationContext,
        method: &str,
        path: &str,
    ) -> (Response, FailureReport) {
        let report = FailureReport::new(failure, self.classifier());

        tracing::error!(
            trace_id = %correlation.trace_id(),
            request_id = %correlation.request_id(),
            http.method = %method,
            http.path = %path,
            http.status_code = report.status_code(),
            error = %report.classified.category,
            exception = %report.message,
            detail = report.classified.detail.as_deref(),
            stack = report.stack.as_deref(),
            "Exception caught"
        );

        let envelope = self.envelope(&report, correlation, method, path);
        let body = serde_json::to_value(&envelope).unwrap_or_default();
        let mut response = Response::json(report.classified.status, &body);
        stamp_correlation(&mut response, correlation);
        (response, report)
    }
}

/// Writes `x-trace-id` and `x-request-id` onto a response.
pub fn stamp_correlation(response: &mut Response, correlation: &CorrelationContext) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(correlation.trace_id().as_str()) {
        headers.insert(TRACE_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&correlation.request_id().to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
}

/// Returns the request's path and query, as the client sent it.
pub(crate) fn request_target(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string)
}

impl Middleware for ResponseErrorRenderer {
    fn name(&self) -> &'static str {
        "response_error_renderer"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let method = request.method().to_string();
            let path = request_target(&request);

            match next.run(ctx, request).await {
                Ok(response) => Ok(response),
                Err(failure) => {
                    let correlation = ctx.ensure_correlation().clone();
                    let (response, report) = self.render(&failure, &correlation, &method, &path);
                    ctx.set_extension(report);
                    Ok(response)
                }
            }
        })
    }
}
