//! Configuration errors.

use broker_core::BrokerError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing required setting {field}")]
    Missing {
        /// Setting name.
        field: &'static str,
    },

    /// A setting has an unusable value.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Setting name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Settings contradict each other.
    #[error("contradictory configuration: {0}")]
    Contradiction(String),

    /// Field-level validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file {path}: {message}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for BrokerError {
    fn from(err: ConfigError) -> Self {
        BrokerError::config(err.to_string())
    }
}
