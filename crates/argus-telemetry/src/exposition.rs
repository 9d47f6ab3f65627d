//! Prometheus text exposition (format version 0.0.4).
//!
//! [`SnapshotCollector`] turns a [`MetricsSnapshot`] into `prometheus`
//! metric families; [`encode`] registers it in a scratch [`Registry`] and
//! runs the crate's [`TextEncoder`]. Families with no samples yet (no errors
//! recorded, say) are left out of the output, as `Registry::gather` does.
//!
//! | Family | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | Counter | - |
//! | `http_requests_by_method_total` | Counter | `method` |
//! | `http_errors_total` | Counter | `status` |
//! | `http_response_time_avg_seconds` | Gauge | - |
//! | `process_uptime_seconds` | Counter | - |
//! | `up` | Gauge | - |

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::aggregator::MetricsSnapshot;
use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Content type served alongside the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// The aggregator's counters as `prometheus` metrics.
#[derive(Debug, Clone)]
pub struct SnapshotCollector {
    requests: IntCounter,
    requests_by_method: IntCounterVec,
    errors_by_status: IntCounterVec,
    response_time_avg: Gauge,
    uptime: IntCounter,
    up: IntGauge,
}

impl SnapshotCollector {
    fn empty() -> prometheus::Result<Self> {
        Ok(Self {
            requests: IntCounter::with_opts(Opts::new(
                "http_requests_total",
                "Total number of HTTP requests",
            ))?,
            requests_by_method: IntCounterVec::new(
                Opts::new(
                    "http_requests_by_method_total",
                    "Total number of HTTP requests by method",
                ),
                &["method"],
            )?,
            errors_by_status: IntCounterVec::new(
                Opts::new(
                    "http_errors_total",
                    "Total number of HTTP errors by status code",
                ),
                &["status"],
            )?,
            response_time_avg: Gauge::with_opts(Opts::new(
                "http_response_time_avg_seconds",
                "Average response time in seconds over the most recent requests",
            ))?,
            uptime: IntCounter::with_opts(Opts::new(
                "process_uptime_seconds",
                "Process uptime in seconds",
            ))?,
            up: IntGauge::with_opts(Opts::new("up", "Service availability"))?,
        })
    }

    /// Builds the families from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Exposition`] if a family cannot be built.
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> TelemetryResult<Self> {
        let collector = Self::empty().map_err(exposition_error)?;

        collector.requests.inc_by(snapshot.total_requests);
        for (method, count) in &snapshot.requests_by_method {
            collector
                .requests_by_method
                .with_label_values(&[method.as_str()])
                .inc_by(*count);
        }
        for (status, count) in &snapshot.errors_by_status {
            let status = status.to_string();
            collector
                .errors_by_status
                .with_label_values(&[status.as_str()])
                .inc_by(*count);
        }
        collector
            .response_time_avg
            .set(snapshot.average_response_time_ms() / 1000.0);
        collector.uptime.inc_by(snapshot.uptime_seconds());
        collector.up.set(1);

        Ok(collector)
    }
}

impl Collector for SnapshotCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.requests.desc();
        descs.extend(self.requests_by_method.desc());
        descs.extend(self.errors_by_status.desc());
        descs.extend(self.response_time_avg.desc());
        descs.extend(self.uptime.desc());
        descs.extend(self.up.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.requests.collect();
        families.extend(self.requests_by_method.collect());
        families.extend(self.errors_by_status.collect());
        families.extend(self.response_time_avg.collect());
        families.extend(self.uptime.collect());
        families.extend(self.up.collect());
        families
    }
}

/// Renders a snapshot in the text format.
///
/// # Errors
///
/// Returns [`TelemetryError::Exposition`] if registration or encoding fails.
///
/// # Example
///
/// ```
/// use argus_telemetry::{exposition, MetricsAggregator};
///
/// let metrics = MetricsAggregator::new();
/// metrics.increment_request("GET");
///
/// let text = exposition::encode(&metrics.snapshot()).unwrap();
/// assert!(text.contains("# TYPE http_requests_total counter\nhttp_requests_total 1\n"));
/// ```
pub fn encode(snapshot: &MetricsSnapshot) -> TelemetryResult<String> {
    let registry = Registry::new();
    registry
        .register(Box::new(SnapshotCollector::from_snapshot(snapshot)?))
        .map_err(exposition_error)?;

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .map_err(exposition_error)?;
    String::from_utf8(buffer).map_err(exposition_error)
}

fn exposition_error(error: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Exposition(error.to_string())
}
