//! Recording listener calls from spawned tasks.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;

/// How long [`CallLog::wait_for`] waits before failing the test.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// How long [`settle`] lets pending tasks run.
const SETTLE: Duration = Duration::from_millis(50);

/// Give already-spawned listener tasks time to run.
///
/// Use before asserting that something did *not* happen.
pub async fn settle() {
    tokio::time::sleep(SETTLE).await;
}

/// Thread-safe log of listener calls that tests can await.
///
/// Clones share the same log.
pub struct CallLog<T> {
    entries: Arc<Mutex<Vec<T>>>,
    notify: Arc<Notify>,
    wait: Duration,
}

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            notify: Arc::clone(&self.notify),
            wait: self.wait,
        }
    }
}

impl<T> fmt::Debug for CallLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog")
            .field("len", &self.len())
            .field("wait", &self.wait)
            .finish()
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallLog<T> {
    /// Create an empty log using [`DEFAULT_WAIT`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            wait: DEFAULT_WAIT,
        }
    }

    /// Override how long [`wait_for`](Self::wait_for) waits.
    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Append an entry and wake waiters.
    pub fn record(&self, entry: T) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        self.notify.notify_waiters();
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> CallLog<T> {
    /// Snapshot of the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<T> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until at least `count` entries are recorded and return them.
    ///
    /// # Panics
    ///
    /// Panics if `count` entries are not recorded in time.
    pub async fn wait_for(&self, count: usize) -> Vec<T> {
        let reached = async {
            loop {
                // Registered before the check so a record in between is not lost.
                let notified = self.notify.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        };

        assert!(
            timeout(self.wait, reached).await.is_ok(),
            "expected {count} recorded calls within {:?}, got {}",
            self.wait,
            self.len()
        );
        self.entries()
    }
}
