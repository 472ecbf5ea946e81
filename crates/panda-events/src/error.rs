//! Error types for the event emitter.

use thiserror::Error;

/// Errors returned by emitter operations that can fail.
///
/// Registration, emission and removal never fail at runtime; these errors
/// come from parsing listener ids and loading configuration.
#[derive(Debug, Error)]
pub enum EventError {
    /// A caller-supplied value was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse config {path}: {source}")]
    Config {
        /// Where the document came from (a path or `<inline>`).
        path: String,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for emitter operations.
pub type EventResult<T> = Result<T, EventError>;

/// Failure raised inside a dispatched listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener panicked while running.
    #[error("listener panicked: {0}")]
    Panicked(String),

    /// The listener returned an error.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// The listener was never run: the emit happened outside a tokio
    /// runtime.
    #[error("no tokio runtime to run the listener on")]
    NoRuntime,
}

impl ListenerError {
    /// Build a [`ListenerError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// Whether this failure came from a panic rather than a returned error.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}
