//! Logging setup.
//!
//! `RUST_LOG` always wins over the configured level when it is set.

use std::str::FromStr;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::InvalidFormat(other.to_string())),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. `info`, `broker_sdk=debug`)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Create a configuration with the given level
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Map a `-v` count to a level: warn, info, debug, then trace
    #[must_use]
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            level: level.to_string(),
            with_target: verbose > 1,
            ..Default::default()
        }
    }

    /// Overlay `LOG_LEVEL` and `LOG_FORMAT` from the environment
    ///
    /// # Errors
    /// Returns error if `LOG_FORMAT` is not a known format
    pub fn with_env(self) -> Result<Self, LoggingError> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError> {
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT").filter(|v| !v.trim().is_empty()) {
            self.format = format.parse()?;
        }
        Ok(self)
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Switch to JSON output when `json` is true
    #[must_use]
    pub fn json(self, json: bool) -> Self {
        if json {
            self.with_format(LogFormat::Json)
        } else {
            self
        }
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns error if the filter is invalid or a subscriber is already set
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?,
    };

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(config.with_target)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(config.with_target)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to install the subscriber
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    /// The filter directive could not be parsed
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    /// Unknown `LOG_FORMAT` value
    #[error("Invalid log format '{0}', expected 'text' or 'json'")]
    InvalidFormat(String),
}

/// Create a span for one auth tier attempt
#[macro_export]
macro_rules! auth_tier_span {
    ($service:expr, $tier:expr) => {
        tracing::info_span!(
            "auth_tier",
            service = %$service,
            tier = %$tier
        )
    };
}

/// Create a span for a generation call
#[macro_export]
macro_rules! generation_span {
    ($service:expr, $operation:expr) => {
        tracing::info_span!(
            "generation",
            service = %$service,
            operation = %$operation
        )
    };
    ($service:expr, $operation:expr, $model:expr) => {
        tracing::info_span!(
            "generation",
            service = %$service,
            operation = %$operation,
            model = %$model
        )
    };
}
