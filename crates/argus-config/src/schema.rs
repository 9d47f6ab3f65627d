//! Configuration schema types.
//!
//! This module defines the structure of each configuration section.

use argus_core::RuntimeMode;
use argus_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Telemetry configuration section.
///
/// # Example
///
/// ```
/// use argus_config::TelemetrySection;
///
/// let section = TelemetrySection::default();
/// assert_eq!(section.service_name, "argus");
/// assert_eq!(section.logging.level, "debug");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name attached to log output.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log subscriber settings.
    #[serde(default)]
    pub logging: LogConfig,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LogConfig::default(),
        }
    }
}

impl TelemetrySection {
    /// The section preset for a runtime mode.
    #[must_use]
    pub fn for_mode(mode: RuntimeMode) -> Self {
        Self {
            logging: LogConfig::for_mode(mode),
            ..Self::default()
        }
    }
}

fn default_service_name() -> String {
    "argus".to_string()
}

/// Metrics scrape endpoint configuration.
///
/// ```toml
/// [metrics]
/// enabled = true
/// path = "/metrics"
/// api_key = "change-me"
/// install_recorder = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsEndpointConfig {
    /// Serve the exposition endpoint.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Route the endpoint is mounted at.
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Pre-shared key required in `x-api-key`. `None` leaves the endpoint
    /// open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Install a Prometheus recorder for the `metrics` facade at init.
    /// Leave off when the host installs its own recorder.
    #[serde(default)]
    pub install_recorder: bool,
}

impl Default for MetricsEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
            api_key: None,
            install_recorder: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
