//! Typed configuration for Argus.
//!
//! - TOML and JSON configuration files
//! - `.env` files via `dotenvy`
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → `.env` → env)
//!
//! # Overview
//!
//! [`ArgusConfig`] holds:
//!
//! - `mode` - The [`RuntimeMode`](argus_core::RuntimeMode) switch
//! - [`TelemetrySection`] - Service name and log subscriber settings
//! - [`MetricsEndpointConfig`] - Scrape route and optional API key
//!
//! # Example
//!
//! ```no_run
//! use argus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), argus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("argus.toml")?
//!     .with_env_prefix("ARGUS")
//!     .load()?;
//!
//! println!("running in {} mode", config.mode);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! mode = "production"
//!
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! level = "warn"
//! json_format = true
//!
//! [metrics]
//! enabled = true
//! path = "/metrics"
//! api_key = "change-me"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`:
//!
//! - `ARGUS__MODE=production`
//! - `ARGUS__TELEMETRY__LOGGING__LEVEL=info`
//! - `ARGUS__METRICS__API_KEY=change-me`

#![doc(html_root_url = "https://docs.rs/argus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{ArgusConfig, ArgusConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{MetricsEndpointConfig, TelemetrySection};

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::RuntimeMode;

    #[test]
    fn test_default_config() {
        let config = ArgusConfig::default();
        assert_eq!(config.mode, RuntimeMode::Development);
        assert_eq!(config.telemetry.service_name, "argus");
    }

    #[test]
    fn test_production_preset_hides_detail() {
        let config = ArgusConfig::production();
        assert!(config.mode.is_production());
        assert!(!config.mode.exposes_stack());
    }
}
