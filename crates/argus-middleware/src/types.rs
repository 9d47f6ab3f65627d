//! Common types used throughout the middleware pipeline.

use argus_core::Failure;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type used in the middleware pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// What a stage or handler produces: a response, or the failure that ended
/// the request.
pub type Outcome = Result<Response, Failure>;

/// Extension trait for building responses without fallible builders.
pub trait ResponseExt {
    /// Creates a response with the given status, content type and body.
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response;

    /// Creates an `application/json` response from a serialized value.
    fn json(status: StatusCode, value: &serde_json::Value) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response {
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    fn json(status: StatusCode, value: &serde_json::Value) -> Response {
        Self::with_body(status, "application/json", value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_body() {
        let response = Response::with_body(StatusCode::OK, "text/plain; version=0.0.4", "up 1\n");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(StatusCode::BAD_REQUEST, &serde_json::json!({"a": 1}));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
