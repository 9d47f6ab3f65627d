//! Runtime mode.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// The deployment mode the pipeline runs in.
///
/// This is the only switch controlling client-facing verbosity. It is
/// threaded through construction rather than read from the process
/// environment.
///
/// | Mode | Persistence detail in messages | Stack in envelope |
/// |------|-------------------------------|-------------------|
/// | `Development` | yes | yes |
/// | `Test` | yes | no |
/// | `Production` | no | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Local development.
    #[default]
    Development,
    /// Automated test runs.
    Test,
    /// Externally reachable deployment.
    Production,
}

impl RuntimeMode {
    /// Returns `true` when client messages must not leak schema detail.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns `true` when error envelopes may carry a stack.
    #[must_use]
    pub const fn exposes_stack(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the lowercase name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown runtime mode '{0}', expected development, test or production")]
pub struct ParseModeError(pub String);

impl FromStr for RuntimeMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert!(RuntimeMode::Production.is_production());
        assert!(!RuntimeMode::Test.is_production());
        assert!(RuntimeMode::Development.exposes_stack());
        assert!(!RuntimeMode::Test.exposes_stack());
        assert!(!RuntimeMode::Production.exposes_stack());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("production".parse::<RuntimeMode>(), Ok(RuntimeMode::Production));
        assert_eq!("Dev".parse::<RuntimeMode>(), Ok(RuntimeMode::Development));
        assert_eq!("test".parse::<RuntimeMode>(), Ok(RuntimeMode::Test));
        assert!("staging".parse::<RuntimeMode>().is_err());
    }

    #[test]
    fn test_mode_deserialize() {
        let mode: RuntimeMode = serde_json::from_str(r#""production""#).unwrap();
        assert_eq!(mode, RuntimeMode::Production);
    }
}
