//! Error types for the broker.

use crate::auth::AuthMode;
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur while resolving auth or calling a gateway.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Required configuration is missing or contradictory.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration issue.
        message: String,
    },

    /// A single authentication tier failed; the resolver falls through.
    #[error("Auth tier '{tier}' failed: {reason}")]
    AuthTier {
        /// The tier that failed.
        tier: AuthMode,
        /// Why it failed.
        reason: String,
    },

    /// Network-level or server-side failure worth retrying.
    #[error("Transient error: {message}")]
    Transient {
        /// Error message.
        message: String,
        /// HTTP status code, when the gateway answered.
        status: Option<u16>,
    },

    /// The request timed out.
    #[error("Request timed out after {duration_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds.
        duration_ms: u64,
    },

    /// The gateway rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the gateway.
        message: String,
    },

    /// The gateway answered 200 with an unexpected or empty shape.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// Some jobs of a batch failed while others succeeded.
    #[error("Batch partially failed: {failed} of {total} jobs failed")]
    BatchPartialFailure {
        /// Number of failed slots.
        failed: usize,
        /// Total number of slots.
        total: usize,
    },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Local I/O failure (e.g. writing an audio file).
    #[error("IO error: {context}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Internal invariant violation.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

/// Coarse classification of a [`BrokerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration error.
    Config,
    /// Auth tier failure.
    AuthTier,
    /// Transient network or server error.
    Transient,
    /// Timeout.
    Timeout,
    /// Non-retryable API rejection.
    Api,
    /// Malformed response.
    MalformedResponse,
    /// Partial batch failure.
    BatchPartialFailure,
    /// Cancelled.
    Cancelled,
    /// Local I/O.
    Io,
    /// Internal error.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::AuthTier => "auth_tier",
            Self::Transient => "transient",
            Self::Timeout => "timeout",
            Self::Api => "api",
            Self::MalformedResponse => "malformed_response",
            Self::BatchPartialFailure => "batch_partial_failure",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl BrokerError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an auth tier failure.
    pub fn auth_tier(tier: AuthMode, reason: impl Into<String>) -> Self {
        Self::AuthTier {
            tier,
            reason: reason.into(),
        }
    }

    /// Create a transient error without a status code.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            status: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create an error from an HTTP status returned by the gateway.
    ///
    /// 408, 429 and 5xx statuses map to [`BrokerError::Transient`], every
    /// other status to [`BrokerError::Api`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_retryable_status(status) {
            Self::Transient {
                message,
                status: Some(status),
            }
        } else {
            Self::Api { status, message }
        }
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::AuthTier { .. } => ErrorKind::AuthTier,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Api { .. } => ErrorKind::Api,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::BatchPartialFailure { .. } => ErrorKind::BatchPartialFailure,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    /// Get the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            _ => None,
        }
    }
}

/// Check if a status code should trigger a retry.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}
