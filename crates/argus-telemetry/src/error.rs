//! Telemetry error types.

use thiserror::Error;

/// Errors raised by telemetry setup and exposition.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to install the log subscriber.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Failed to install the metrics recorder.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to render the Prometheus exposition.
    #[error("Failed to render metrics: {0}")]
    Exposition(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("already set".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: already set");
        let err = TelemetryError::MetricsInit("recorder already installed".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to initialize metrics: recorder already installed"
        );
        let err = TelemetryError::InvalidConfig("empty level".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: empty level");
    }
}
