//! Listener ids of the form `<index>@<eventName>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EventError, EventResult};

/// Handle returned by [`PandaEvents::on`](crate::PandaEvents::on) and
/// [`PandaEvents::once`](crate::PandaEvents::once).
///
/// The index is the listener's slot and the event name is the exact name it
/// was registered under. Event names may themselves contain `@`; only the
/// first `@` separates the two parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId {
    raw: String,
    index: usize,
    split: usize,
}

impl ListenerId {
    /// Compose an id from a slot index and an event name.
    #[must_use]
    pub fn new(index: usize, event: &str) -> Self {
        let prefix = index.to_string();
        let split = prefix.len();
        Self {
            raw: format!("{prefix}@{event}"),
            index,
            split,
        }
    }

    /// Parse an id string.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidArgument`] if the string has no `@`, or if
    /// the part before the first `@` is not a non-negative integer.
    pub fn parse(s: &str) -> EventResult<Self> {
        let Some((prefix, _)) = s.split_once('@') else {
            return Err(EventError::InvalidArgument(format!(
                "listener id `{s}` has no `@` separator"
            )));
        };

        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EventError::InvalidArgument(format!(
                "listener id `{s}` does not start with a slot index"
            )));
        }

        let index = prefix.parse::<usize>().map_err(|e| {
            EventError::InvalidArgument(format!("listener id `{s}` has an invalid index: {e}"))
        })?;

        Ok(Self {
            raw: s.to_string(),
            index,
            split: prefix.len(),
        })
    }

    /// Slot index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Event name the listener was registered under.
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.raw
            .get(self.split..)
            .and_then(|rest| rest.strip_prefix('@'))
            .unwrap_or_default()
    }

    /// The composed `<index>@<eventName>` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ListenerId {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ListenerId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl From<ListenerId> for String {
    fn from(id: ListenerId) -> Self {
        id.raw
    }
}

impl Serialize for ListenerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ListenerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose() {
        let id = ListenerId::new(12, "sum");
        assert_eq!(id.as_str(), "12@sum");
        assert_eq!(id.index(), 12);
        assert_eq!(id.event_name(), "sum");
        assert_eq!(id.to_string(), "12@sum");
    }

    #[test]
    fn test_event_name_with_at_signs() {
        let id = ListenerId::parse("3@user@example.com").unwrap();
        assert_eq!(id.index(), 3);
        assert_eq!(id.event_name(), "user@example.com");

        let composed = ListenerId::new(3, "user@example.com");
        assert_eq!(composed, id);
    }

    #[test]
    fn test_empty_event_name() {
        let id = ListenerId::parse("0@").unwrap();
        assert_eq!(id.index(), 0);
        assert_eq!(id.event_name(), "");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["sum", "@sum", "x@sum", "-1@sum", "1.5@sum", " 1@sum", ""] {
            assert!(
                matches!(ListenerId::parse(bad), Err(EventError::InvalidArgument(_))),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let huge = format!("{}0@sum", usize::MAX);
        assert!(ListenerId::parse(&huge).is_err());
    }

    #[test]
    fn test_from_str_and_serde() {
        let id: ListenerId = "7@tick".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"7@tick\"");

        let back: ListenerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<ListenerId>("\"tick\"").is_err());
    }
}
