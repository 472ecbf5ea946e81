//! Telemetry error types.

use thiserror::Error;

/// Errors raised while building or installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log configuration is invalid (bad filter directive, unreadable
    /// TOML, unusable log directory).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A global subscriber could not be installed, usually because one is
    /// already set.
    #[error("Initialization error: {0}")]
    InitError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
