//! Mirroring into the `metrics` facade.
//!
//! The aggregator is the source of truth for the `/metrics` endpoint. These
//! helpers forward the same events to the global `metrics` recorder.
//! [`init_metrics`] installs a Prometheus recorder for hosts that have none;
//! a host that brings its own recorder skips it. Without any recorder the
//! helpers are no-ops.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `argus_requests_total` | Counter | `method` |
//! | `argus_request_duration_seconds` | Histogram | `method` |
//! | `argus_errors_total` | Counter | `status` |

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of requests entering the pipeline.
pub const REQUESTS_TOTAL: &str = "argus_requests_total";

/// Histogram of request durations.
pub const REQUEST_DURATION_SECONDS: &str = "argus_request_duration_seconds";

/// Counter of failed requests.
pub const ERRORS_TOTAL: &str = "argus_errors_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs a Prometheus recorder as the global `metrics` recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if a global recorder is already
/// installed.
pub fn init_metrics() -> TelemetryResult<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders the facade metrics recorded so far.
///
/// Returns `None` unless [`init_metrics`] succeeded.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, Unit::Count, "Total number of HTTP requests");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_counter!(ERRORS_TOTAL, Unit::Count, "Total number of failed HTTP requests");
}

/// Records a request entering the pipeline.
pub fn record_request(method: &str) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string()).increment(1);
}

/// Records a request duration.
pub fn record_duration(method: &str, duration: Duration) {
    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Records a failed request.
pub fn record_error(status: u16) {
    counter!(ERRORS_TOTAL, "status" => status.to_string()).increment(1);
}
