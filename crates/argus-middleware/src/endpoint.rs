//! The metrics exposition endpoint.
//!
//! Serves the aggregator's Prometheus text rendering. Authentication is
//! optional: with an API key configured, requests must carry it in the
//! `x-api-key` header or they fail with a 401 that the pipeline renders like
//! any other failure.

use std::sync::Arc;

use argus_core::Failure;
use argus_telemetry::{MetricsAggregator, EXPOSITION_CONTENT_TYPE};
use http::StatusCode;

use crate::context::MiddlewareContext;
use crate::middleware::BoxFuture;
use crate::types::{Outcome, Request, Response, ResponseExt};

/// Header carrying the pre-shared metrics key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Handler for the metrics scrape route.
#[derive(Debug, Clone)]
pub struct MetricsEndpoint {
    aggregator: Arc<MetricsAggregator>,
    api_key: Option<String>,
}

impl MetricsEndpoint {
    /// Creates an unauthenticated endpoint.
    #[must_use]
    pub fn new(aggregator: Arc<MetricsAggregator>) -> Self {
        Self {
            aggregator,
            api_key: None,
        }
    }

    /// Requires `key` in the `x-api-key` header. An empty key disables the
    /// check.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Returns whether requests must present a key.
    #[must_use]
    pub fn requires_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Answers one scrape.
    ///
    /// # Errors
    ///
    /// Returns a 401 [`Failure`] when a key is configured and the request
    /// does not present it, or a runtime failure if rendering fails.
    pub fn respond(&self, request: &Request) -> Outcome {
        if let Some(expected) = &self.api_key {
            let presented = request
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok());
            if presented != Some(expected.as_str()) {
                tracing::warn!("metrics scrape rejected: missing or invalid api key");
                return Err(Failure::unauthorized("Invalid API key"));
            }
        }
        let text = self
            .aggregator
            .render_exposition()
            .map_err(|e| Failure::from_error(&e))?;
        Ok(Response::with_body(StatusCode::OK, EXPOSITION_CONTENT_TYPE, text))
    }

    /// Wraps the endpoint as a pipeline handler.
    pub fn handler(
        &self,
    ) -> impl FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Outcome> + Send + 'static
    {
        let endpoint = self.clone();
        move |_ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, Outcome> {
            let outcome = endpoint.respond(&request);
            Box::pin(async move { outcome })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http_body_util::{BodyExt, Full};

    fn scrape(key: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/metrics");
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    #[tokio::test]
    async fn test_open_endpoint_serves_exposition() {
        let aggregator = Arc::new(MetricsAggregator::new());
        aggregator.increment_request("GET");
        let endpoint = MetricsEndpoint::new(aggregator);

        let response = endpoint.respond(&scrape(None)).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("http_requests_total 1"));
        assert!(text.contains("up 1"));
    }

    #[test]
    fn test_api_key_is_enforced() {
        let endpoint = MetricsEndpoint::new(Arc::new(MetricsAggregator::new())).with_api_key("s3cret");
        assert!(endpoint.requires_key());

        assert!(matches!(
            endpoint.respond(&scrape(None)),
            Err(Failure::Http { status: 401, .. })
        ));
        assert!(endpoint.respond(&scrape(Some("wrong"))).is_err());
        assert!(endpoint.respond(&scrape(Some("s3cret"))).is_ok());
    }

    #[test]
    fn test_empty_key_disables_check() {
        let endpoint = MetricsEndpoint::new(Arc::new(MetricsAggregator::new())).with_api_key("");
        assert!(!endpoint.requires_key());
        assert!(endpoint.respond(&scrape(None)).is_ok());
    }
}
