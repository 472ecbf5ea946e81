//! Listener storage and its private/global scopes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::listener::Listener;

/// Process-wide storage shared by every emitter built with
/// [`StorageScope::Global`].
static GLOBAL_STORAGE: LazyLock<SharedStorage> = LazyLock::new(SharedStorage::default);

/// Where an emitter keeps its listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Containers owned by a single emitter (and its clones).
    #[default]
    Private,
    /// The single process-wide set of containers.
    Global,
}

/// The three correlated containers.
///
/// Slots are tombstoned rather than removed, so an index handed out in a
/// [`ListenerId`](crate::ListenerId) always resolves, possibly to nothing.
#[derive(Debug, Default)]
pub(crate) struct Storage {
    slots: Vec<Option<Listener>>,
    events: HashMap<String, Vec<usize>>,
    once: HashSet<usize>,
}

impl Storage {
    /// Append `listener` to a fresh slot under `event` and return the index.
    pub(crate) fn insert(&mut self, event: &str, listener: Listener, once: bool) -> usize {
        let index = self.slots.len();
        self.slots.push(Some(listener));
        self.events.entry(event.to_string()).or_default().push(index);
        if once {
            self.once.insert(index);
        }
        index
    }

    /// Live listeners for `event` in registration order.
    ///
    /// One-shot listeners among them are consumed here, under the same lock
    /// that collects them: they are unlinked, vacated and dropped from the
    /// once-set, and come back flagged `true`. Concurrent emits can never
    /// both see the same one-shot listener.
    pub(crate) fn take_live(&mut self, event: &str) -> Vec<(usize, Listener, bool)> {
        let Some(indices) = self.events.get_mut(event) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(indices.len());
        let once = &mut self.once;
        let slots = &mut self.slots;
        indices.retain(|&index| {
            let Some(slot) = slots.get_mut(index) else {
                return true;
            };
            if once.remove(&index) {
                if let Some(listener) = slot.take() {
                    live.push((index, listener, true));
                }
                return false;
            }
            if let Some(listener) = slot {
                live.push((index, listener.clone(), false));
            }
            true
        });
        live
    }

    /// Unlink `index` from `event`, vacate its slot and drop it from the
    /// once-set. Vacating an empty slot yields no listener.
    pub(crate) fn remove(&mut self, event: &str, index: usize) -> Option<Listener> {
        if let Some(indices) = self.events.get_mut(event)
            && let Some(pos) = indices.iter().position(|&i| i == index)
        {
            indices.remove(pos);
        }

        let listener = self.slots.get_mut(index).and_then(Option::take);
        self.once.remove(&index);
        listener
    }

    /// First index registered under `event` whose slot holds `listener`.
    pub(crate) fn find(&self, event: &str, listener: &Listener) -> Option<usize> {
        self.events.get(event)?.iter().copied().find(|&index| {
            matches!(self.slots.get(index), Some(Some(l)) if l.ptr_eq(listener))
        })
    }

    /// Indices currently linked to `event`.
    pub(crate) fn indices(&self, event: &str) -> Vec<usize> {
        self.events.get(event).cloned().unwrap_or_default()
    }

    /// Number of live listeners under `event`.
    pub(crate) fn live_count(&self, event: &str) -> usize {
        self.events.get(event).map_or(0, |indices| {
            indices
                .iter()
                .filter(|&&index| matches!(self.slots.get(index), Some(Some(_))))
                .count()
        })
    }

    /// Event names with at least one live listener, sorted.
    pub(crate) fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .events
            .keys()
            .filter(|name| self.live_count(name) > 0)
            .cloned()
            .collect();
        names.sort();
        names
    }

    #[cfg(test)]
    pub(crate) fn is_once(&self, index: usize) -> bool {
        self.once.contains(&index)
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Storage behind a mutex, shared between clones of an emitter.
///
/// The lock is only held for container bookkeeping; listeners never run
/// while it is held.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedStorage(Arc<Mutex<Storage>>);

impl SharedStorage {
    /// Storage for the given scope.
    pub(crate) fn for_scope(scope: StorageScope) -> Self {
        match scope {
            StorageScope::Private => Self::default(),
            StorageScope::Global => GLOBAL_STORAGE.clone(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Storage> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
