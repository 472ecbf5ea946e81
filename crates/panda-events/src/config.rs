//! Emitter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EventError, EventResult};
use crate::storage::StorageScope;

/// Default name of the error event.
pub const DEFAULT_ERROR_EVENT: &str = "error";

/// Default name of the new-listener lifecycle event.
pub const DEFAULT_NEW_LISTENER_EVENT: &str = "newListener";

/// Default name of the remove-listener lifecycle event.
pub const DEFAULT_REMOVE_LISTENER_EVENT: &str = "removeListener";

/// Default capacity of the unhandled-failure channel.
pub const DEFAULT_UNHANDLED_CAPACITY: usize = 256;

/// The three event names the emitter fires on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventNames {
    /// Event receiving `(error, eventName)` when a listener fails.
    pub error: String,
    /// Event receiving `(eventName, listener)` after a registration.
    pub new_listener: String,
    /// Event receiving `(eventName, listener)` after a removal.
    pub remove_listener: String,
}

impl EventNames {
    /// Whether `event` is one of the three lifecycle names. Registering on
    /// these never fires the new-listener event.
    #[must_use]
    pub fn is_reserved(&self, event: &str) -> bool {
        event == self.new_listener || event == self.error || event == self.remove_listener
    }
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            error: DEFAULT_ERROR_EVENT.to_string(),
            new_listener: DEFAULT_NEW_LISTENER_EVENT.to_string(),
            remove_listener: DEFAULT_REMOVE_LISTENER_EVENT.to_string(),
        }
    }
}

/// Construction options, mirroring `{ global: bool }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOptions {
    /// Use the process-wide listener storage.
    #[serde(default)]
    pub global: bool,
}

impl EventOptions {
    /// Storage scope selected by these options.
    #[must_use]
    pub fn scope(self) -> StorageScope {
        if self.global {
            StorageScope::Global
        } else {
            StorageScope::Private
        }
    }
}

/// Full emitter configuration, loadable from TOML.
///
/// ```toml
/// global = false
/// unhandled_capacity = 64
///
/// [names]
/// error = "failure"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Use the process-wide listener storage.
    pub global: bool,
    /// Lifecycle event names.
    pub names: EventNames,
    /// Buffer size of the unhandled-failure broadcast channel.
    pub unhandled_capacity: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            global: false,
            names: EventNames::default(),
            unhandled_capacity: DEFAULT_UNHANDLED_CAPACITY,
        }
    }
}

impl EmitterConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Config`] if the document is malformed, or
    /// [`EventError::InvalidArgument`] if it fails validation.
    pub fn from_toml_str(s: &str) -> EventResult<Self> {
        Self::parse(s, "<inline>")
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`EmitterConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> EventResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents, &path.display().to_string())?;
        debug!(path = %path.display(), "loaded emitter config");
        Ok(config)
    }

    fn parse(s: &str, origin: &str) -> EventResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EventError::Config {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every lifecycle name is non-empty and the channel capacity
    /// is positive.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidArgument`] naming the offending field.
    pub fn validate(&self) -> EventResult<()> {
        for (field, value) in [
            ("names.error", &self.names.error),
            ("names.new_listener", &self.names.new_listener),
            ("names.remove_listener", &self.names.remove_listener),
        ] {
            if value.is_empty() {
                return Err(EventError::InvalidArgument(format!(
                    "{field} must not be empty"
                )));
            }
        }

        if self.unhandled_capacity == 0 {
            return Err(EventError::InvalidArgument(
                "unhandled_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Storage scope selected by this configuration.
    #[must_use]
    pub fn scope(&self) -> StorageScope {
        EventOptions {
            global: self.global,
        }
        .scope()
    }
}
