//! Main configuration types.
//!
//! This module provides the top-level [`ArgusConfig`] struct and its builder.

use argus_core::RuntimeMode;
use argus_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, MetricsEndpointConfig, TelemetrySection};

/// Complete Argus configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use argus_config::ArgusConfig;
/// use argus_core::RuntimeMode;
///
/// let config = ArgusConfig::default();
/// assert_eq!(config.mode, RuntimeMode::Development);
/// assert_eq!(config.metrics.path, "/metrics");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ArgusConfig {
    /// Runtime mode: message verbosity and stack exposure.
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Telemetry configuration (logging).
    #[serde(default)]
    pub telemetry: TelemetrySection,

    /// Metrics endpoint configuration.
    #[serde(default)]
    pub metrics: MetricsEndpointConfig,
}

impl ArgusConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use argus_config::ArgusConfig;
    /// use argus_core::RuntimeMode;
    ///
    /// let config = ArgusConfig::builder()
    ///     .mode(RuntimeMode::Test)
    ///     .build();
    ///
    /// assert_eq!(config.mode, RuntimeMode::Test);
    /// ```
    #[must_use]
    pub fn builder() -> ArgusConfigBuilder {
        ArgusConfigBuilder::new()
    }

    /// Returns the log subscriber settings.
    #[must_use]
    pub fn log_config(&self) -> &LogConfig {
        &self.telemetry.logging
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - Logging is enabled with an empty level
    /// - The metrics path does not start with `/`
    /// - The metrics API key is present but empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.logging.enabled && self.telemetry.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                "must not be empty when logging is enabled",
            ));
        }

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "metrics.path",
                format!("must start with '/': {}", self.metrics.path),
            ));
        }

        if matches!(self.metrics.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "metrics.api_key",
                "must not be empty; omit it to leave the endpoint open",
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Development mode (detailed messages, stacks in envelopes)
    /// - Pretty logs at `debug`
    ///
    /// # Example
    ///
    /// ```
    /// use argus_config::ArgusConfig;
    ///
    /// let config = ArgusConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self::for_mode(RuntimeMode::Development)
    }

    /// Create a production configuration preset.
    ///
    /// - Production mode (generic messages, no stacks)
    /// - JSON logs at `warn`
    ///
    /// # Example
    ///
    /// ```
    /// use argus_config::ArgusConfig;
    ///
    /// let config = ArgusConfig::production();
    /// assert!(config.telemetry.logging.json_format);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        Self::for_mode(RuntimeMode::Production)
    }

    fn for_mode(mode: RuntimeMode) -> Self {
        Self {
            mode,
            telemetry: TelemetrySection::for_mode(mode),
            metrics: MetricsEndpointConfig::default(),
        }
    }
}

/// Builder for [`ArgusConfig`].
#[derive(Debug, Default)]
pub struct ArgusConfigBuilder {
    mode: Option<RuntimeMode>,
    telemetry: Option<TelemetrySection>,
    metrics: Option<MetricsEndpointConfig>,
}

impl ArgusConfigBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the runtime mode.
    #[must_use]
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Set the metrics endpoint section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsEndpointConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the configuration.
    ///
    /// Unset sections take the preset for the chosen mode.
    #[must_use]
    pub fn build(self) -> ArgusConfig {
        let mode = self.mode.unwrap_or_default();
        ArgusConfig {
            mode,
            telemetry: self
                .telemetry
                .unwrap_or_else(|| TelemetrySection::for_mode(mode)),
            metrics: self.metrics.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn build_validated(self) -> Result<ArgusConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArgusConfig::default();
        assert_eq!(config.mode, RuntimeMode::Development);
        assert!(config.metrics.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_uses_mode_presets() {
        let config = ArgusConfig::builder().mode(RuntimeMode::Production).build();
        assert_eq!(config.telemetry.logging.level, "warn");
        assert_eq!(config, ArgusConfig::production());
    }

    #[test]
    fn test_builder_explicit_sections() {
        let config = ArgusConfig::builder()
            .metrics(MetricsEndpointConfig {
                api_key: Some("k".to_string()),
                ..Default::default()
            })
            .build();
        assert_eq!(config.metrics.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_validate_metrics_path() {
        let mut config = ArgusConfig::default();
        config.metrics.path = "metrics".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.path"));

        config.metrics.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_api_key() {
        let result = ArgusConfig::builder()
            .metrics(MetricsEndpointConfig {
                api_key: Some("  ".to_string()),
                ..Default::default()
            })
            .build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_log_level() {
        let mut config = ArgusConfig::default();
        config.telemetry.logging.level = String::new();
        assert!(config.validate().is_err());

        config.telemetry.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_keeps_mode() {
        let config = ArgusConfig::production();
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("mode = \"production\""));
        let parsed: ArgusConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ArgusConfig, _> = toml::from_str("[server]\nhttp_addr = \"0.0.0.0:8080\"");
        assert!(result.is_err());
    }
}
