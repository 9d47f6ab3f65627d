//! Process-wide request metrics.
//!
//! One [`MetricsAggregator`] is created at startup and shared by `Arc` with
//! every pipeline stage and the metrics endpoint. All mutation goes through a
//! single internal lock, so each recording operation is atomic and readers
//! never observe a half-applied update.
//!
//! Response times are kept in a bounded FIFO window of the most recent
//! [`RESPONSE_TIME_WINDOW`] samples; memory stays constant no matter how many
//! requests are served.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::exposition;
use crate::TelemetryResult;

/// Maximum number of response-time samples retained.
pub const RESPONSE_TIME_WINDOW: usize = 1000;

#[derive(Debug)]
struct State {
    total_requests: u64,
    requests_by_method: BTreeMap<String, u64>,
    errors_by_status: BTreeMap<u16, u64>,
    response_times: VecDeque<f64>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl State {
    fn new() -> Self {
        Self {
            total_requests: 0,
            requests_by_method: BTreeMap::new(),
            errors_by_status: BTreeMap::new(),
            response_times: VecDeque::with_capacity(RESPONSE_TIME_WINDOW),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

/// Point-in-time copy of the aggregator's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Requests seen since start or last reset.
    pub total_requests: u64,
    /// Requests per HTTP method.
    pub requests_by_method: BTreeMap<String, u64>,
    /// Failures per HTTP status.
    pub errors_by_status: BTreeMap<u16, u64>,
    /// Retained response-time samples in milliseconds, oldest first.
    pub response_times: Vec<f64>,
    /// When counting started.
    pub start_time: DateTime<Utc>,
    /// Elapsed time since `start_time`.
    #[serde(skip)]
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Mean of the retained response times in milliseconds, or `0.0`.
    #[must_use]
    pub fn average_response_time_ms(&self) -> f64 {
        if self.response_times.is_empty() {
            return 0.0;
        }
        self.response_times.iter().sum::<f64>() / self.response_times.len() as f64
    }

    /// Whole seconds since `start_time`.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime.as_secs()
    }
}

/// Human-oriented view returned by [`MetricsAggregator::metrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Uptime as `"{h}h {m}m {s}s"`.
    pub uptime: String,
    /// Uptime in whole seconds.
    pub uptime_seconds: u64,
    /// Requests seen since start or last reset.
    pub total_requests: u64,
    /// Requests per HTTP method.
    pub requests_by_method: BTreeMap<String, u64>,
    /// Failures per HTTP status.
    pub errors_by_status: BTreeMap<u16, u64>,
    /// Mean response time, e.g. `"150.00ms"`, or `"0ms"` with no samples.
    pub average_response_time: String,
    /// When the report was taken (ISO-8601, millisecond precision).
    pub timestamp: String,
}

impl From<&MetricsSnapshot> for MetricsReport {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        let average_response_time = if snapshot.response_times.is_empty() {
            "0ms".to_string()
        } else {
            format!("{:.2}ms", snapshot.average_response_time_ms())
        };
        Self {
            uptime: format_uptime(snapshot.uptime_seconds()),
            uptime_seconds: snapshot.uptime_seconds(),
            total_requests: snapshot.total_requests,
            requests_by_method: snapshot.requests_by_method.clone(),
            errors_by_status: snapshot.errors_by_status.clone(),
            average_response_time,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

fn format_uptime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

/// Thread-safe request counters with a bounded response-time window.
///
/// # Example
///
/// ```
/// use argus_telemetry::MetricsAggregator;
///
/// let metrics = MetricsAggregator::new();
/// metrics.increment_request("GET");
/// metrics.record_response_time(150.0);
/// metrics.record_error(404);
///
/// let report = metrics.metrics();
/// assert_eq!(report.total_requests, 1);
/// assert_eq!(report.average_response_time, "150.00ms");
/// let text = metrics.render_exposition().unwrap();
/// assert!(text.contains("http_errors_total{status=\"404\"} 1"));
/// ```
#[derive(Debug)]
pub struct MetricsAggregator {
    state: Mutex<State>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    /// Creates an aggregator with zeroed counters and the time base set to now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    /// Counts one request for `method`.
    pub fn increment_request(&self, method: &str) {
        let mut state = self.state.lock();
        state.total_requests += 1;
        *state
            .requests_by_method
            .entry(method.to_string())
            .or_insert(0) += 1;
    }

    /// Appends a response-time sample, evicting the oldest beyond the window.
    pub fn record_response_time(&self, millis: f64) {
        let mut state = self.state.lock();
        state.response_times.push_back(millis);
        while state.response_times.len() > RESPONSE_TIME_WINDOW {
            state.response_times.pop_front();
        }
    }

    /// Counts one failure with the given status.
    pub fn record_error(&self, status: u16) {
        let mut state = self.state.lock();
        *state.errors_by_status.entry(status).or_insert(0) += 1;
    }

    /// Returns a raw copy of the current counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock();
        MetricsSnapshot {
            total_requests: state.total_requests,
            requests_by_method: state.requests_by_method.clone(),
            errors_by_status: state.errors_by_status.clone(),
            response_times: state.response_times.iter().copied().collect(),
            start_time: state.started_at,
            uptime: state.started.elapsed(),
        }
    }

    /// Returns the formatted report view.
    #[must_use]
    pub fn metrics(&self) -> MetricsReport {
        MetricsReport::from(&self.snapshot())
    }

    /// Renders the current counters in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Exposition`](crate::TelemetryError::Exposition)
    /// if the text encoder rejects the families.
    pub fn render_exposition(&self) -> TelemetryResult<String> {
        exposition::encode(&self.snapshot())
    }

    /// Zeroes every counter and restarts the time base.
    pub fn reset(&self) {
        *self.state.lock() = State::new();
    }
}
