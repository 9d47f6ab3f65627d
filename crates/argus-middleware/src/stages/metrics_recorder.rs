//! Metrics recording middleware.
//!
//! Feeds the shared [`MetricsAggregator`] and mirrors each event into the
//! `metrics` facade:
//!
//! - on entry: one request count for the method
//! - on exit: one response-time sample, plus one error count for the
//!   classified status when the request failed
//!
//! A request dropped before it finishes is recorded as a 499.

use std::sync::Arc;
use std::time::Instant;

use argus_core::{ErrorClassifier, Failure, RuntimeMode};
use argus_telemetry::{metrics, MetricsAggregator};

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::error_renderer::FailureReport,
    types::{Outcome, Request},
};

/// Middleware that records per-request counters and timings.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    aggregator: Arc<MetricsAggregator>,
    mode: RuntimeMode,
}

impl MetricsRecorder {
    /// Creates a recorder feeding `aggregator`.
    #[must_use]
    pub fn new(aggregator: Arc<MetricsAggregator>, mode: RuntimeMode) -> Self {
        Self { aggregator, mode }
    }

    /// Returns the aggregator this recorder feeds.
    #[must_use]
    pub fn aggregator(&self) -> &Arc<MetricsAggregator> {
        &self.aggregator
    }
}

struct Pending<'s> {
    aggregator: &'s MetricsAggregator,
    classifier: ErrorClassifier,
    method: String,
    started: Instant,
    settled: bool,
}

impl Pending<'_> {
    fn settle(&mut self, error_status: Option<u16>) {
        if std::mem::replace(&mut self.settled, true) {
            return;
        }
        let elapsed = self.started.elapsed();
        self.aggregator
            .record_response_time(elapsed.as_secs_f64() * 1000.0);
        metrics::record_duration(&self.method, elapsed);
        if let Some(status) = error_status {
            self.aggregator.record_error(status);
            metrics::record_error(status);
        }
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let status = self.classifier.classify(&Failure::ClientClosed).status_code();
            self.settle(Some(status));
        }
    }
}

impl Middleware for MetricsRecorder {
    fn name(&self) -> &'static str {
        "metrics_recorder"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let method = request.method().to_string();
            self.aggregator.increment_request(&method);
            metrics::record_request(&method);

            let mut pending = Pending {
                aggregator: &self.aggregator,
                classifier: ErrorClassifier::new(self.mode),
                method,
                started: Instant::now(),
                settled: false,
            };

            let outcome = next.run(ctx, request).await;
            let error_status = match &outcome {
                Ok(_) => ctx
                    .get_extension::<FailureReport>()
                    .map(FailureReport::status_code),
                Err(failure) => Some(pending.classifier.classify(failure).status_code()),
            };
            pending.settle(error_status);
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use argus_core::ConstraintViolation;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::time::Duration;

    fn recorder() -> MetricsRecorder {
        MetricsRecorder::new(Arc::new(MetricsAggregator::new()), RuntimeMode::Production)
    }

    fn request(method: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/items")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_counts_request_and_time() {
        let recorder = recorder();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::with_body(StatusCode::OK, "text/plain", "ok")) })
        });
        recorder.process(&mut ctx, request("GET"), next).await.unwrap();

        let snapshot = recorder.aggregator().snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.requests_by_method.get("GET"), Some(&1));
        assert_eq!(snapshot.response_times.len(), 1);
        assert!(snapshot.errors_by_status.is_empty());
    }

    #[tokio::test]
    async fn test_failure_counts_classified_status() {
        let recorder = recorder();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(Failure::from(ConstraintViolation::unique("Key (email)=(a@b.c) already exists."))) })
        });
        let outcome = recorder.process(&mut ctx, request("POST"), next).await;
        assert!(outcome.is_err());

        let snapshot = recorder.aggregator().snapshot();
        assert_eq!(snapshot.errors_by_status.get(&400), Some(&1));
        assert_eq!(snapshot.response_times.len(), 1);
    }

    #[tokio::test]
    async fn test_rendered_failure_counts_report_status() {
        let recorder = recorder();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|ctx, _req| {
            ctx.set_extension(FailureReport::new(
                &Failure::not_found("gone"),
                ErrorClassifier::default(),
            ));
            Box::pin(async { Ok(Response::with_body(StatusCode::NOT_FOUND, "application/json", "{}")) })
        });
        recorder.process(&mut ctx, request("DELETE"), next).await.unwrap();

        let snapshot = recorder.aggregator().snapshot();
        assert_eq!(snapshot.errors_by_status.get(&404), Some(&1));
        assert_eq!(snapshot.requests_by_method.get("DELETE"), Some(&1));
    }

    #[tokio::test]
    async fn test_abandoned_request_records_499_once() {
        let recorder = recorder();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(std::future::pending::<Outcome>()));

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            recorder.process(&mut ctx, request("GET"), next),
        )
        .await;
        assert!(result.is_err());

        let snapshot = recorder.aggregator().snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.errors_by_status.get(&499), Some(&1));
        assert_eq!(snapshot.response_times.len(), 1);
    }

    #[test]
    fn test_events_mirrored_to_facade() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let facade = DebuggingRecorder::new();
        let snapshotter = facade.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let recorder = recorder();
        ::metrics::with_local_recorder(&facade, || {
            runtime.block_on(async {
                let mut ctx = MiddlewareContext::new();
                let next = Next::handler(|_ctx, _req| {
                    Box::pin(async { Err(Failure::from(ConstraintViolation::not_null("email"))) })
                });
                let _ = recorder.process(&mut ctx, request("POST"), next).await;
            });
        });

        let mut seen: Vec<(String, Vec<String>, DebugValue)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| {
                let labels = key
                    .key()
                    .labels()
                    .map(|label| format!("{}={}", label.key(), label.value()))
                    .collect();
                (key.key().name().to_string(), labels, value)
            })
            .collect();
        seen.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, argus_telemetry::metrics::ERRORS_TOTAL);
        assert_eq!(seen[0].1, vec!["status=400".to_string()]);
        assert_eq!(seen[0].2, DebugValue::Counter(1));
        assert_eq!(seen[1].0, argus_telemetry::metrics::REQUEST_DURATION_SECONDS);
        assert_eq!(seen[1].1, vec!["method=POST".to_string()]);
        assert!(matches!(&seen[1].2, DebugValue::Histogram(samples) if samples.len() == 1));
        assert_eq!(seen[2].0, argus_telemetry::metrics::REQUESTS_TOTAL);
        assert_eq!(seen[2].2, DebugValue::Counter(1));
        assert_eq!(recorder.aggregator().snapshot().errors_by_status.get(&400), Some(&1));
    }
}
