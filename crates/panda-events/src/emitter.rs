//! The event emitter: registration, emission and removal.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, trace};

use crate::config::{EmitterConfig, EventNames, EventOptions};
use crate::error::ListenerError;
use crate::id::ListenerId;
use crate::listener::{EventArg, EventArgs, Listener};
use crate::storage::{SharedStorage, StorageScope};

/// A listener failure that no error-event listener observed.
#[derive(Debug, Clone)]
pub struct UnhandledFailure {
    /// Event whose listener failed.
    pub event: String,
    /// The failure.
    pub error: Arc<ListenerError>,
    /// When the failure was caught.
    pub occurred_at: DateTime<Utc>,
}

struct Inner {
    scope: StorageScope,
    storage: SharedStorage,
    names: RwLock<EventNames>,
    unhandled: broadcast::Sender<UnhandledFailure>,
}

/// In-process publish/subscribe event emitter.
///
/// Listeners are registered under an event name with [`on`](Self::on) or
/// [`once`](Self::once) and run as spawned tokio tasks when the event is
/// [emitted](Self::emit). Emitting never waits for a listener.
///
/// Three event names are fired by the emitter itself (see [`EventNames`]):
///
/// - the new-listener event, with `(eventName, listener)`, after every
///   registration on a non-lifecycle name;
/// - the remove-listener event, with `(eventName, listener)`, after every
///   removal that vacated a slot;
/// - the error event, with `(error, eventName)`, when a listener fails and
///   the error event has listeners. Otherwise the failure is logged and
///   published on the [unhandled channel](Self::subscribe_unhandled).
///
/// Lifecycle events are dispatched exactly like regular emits, so their
/// listeners run after the registering or removing call has returned.
///
/// Clones share storage, lifecycle names and the unhandled channel.
///
/// # Example
///
/// ```rust
/// use panda_events::{Listener, PandaEvents, event_args};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let events = PandaEvents::new();
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
///
/// let id = events.on(
///     "sum",
///     Listener::new(move |args| {
///         let a = args.as_i64(0).unwrap_or_default();
///         let b = args.as_i64(1).unwrap_or_default();
///         tx.send(a + b)?;
///         Ok(())
///     }),
/// );
/// assert_eq!(id.as_str(), "0@sum");
///
/// events.emit("sum", event_args![2, 3]);
/// assert_eq!(rx.recv().await, Some(5));
/// # }
/// ```
#[derive(Clone)]
pub struct PandaEvents {
    inner: Arc<Inner>,
}

impl PandaEvents {
    /// Emitter with private storage and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&EmitterConfig::default())
    }

    /// Emitter bound to the process-wide storage.
    #[must_use]
    pub fn global() -> Self {
        Self::with_options(EventOptions { global: true })
    }

    /// Emitter built from `{ global }` options.
    #[must_use]
    pub fn with_options(options: EventOptions) -> Self {
        Self::from_config(&EmitterConfig {
            global: options.global,
            ..EmitterConfig::default()
        })
    }

    /// Emitter built from a full configuration.
    ///
    /// A zero `unhandled_capacity` is raised to one; use
    /// [`EmitterConfig::validate`] to reject it instead.
    #[must_use]
    pub fn from_config(config: &EmitterConfig) -> Self {
        let scope = config.scope();
        let (unhandled, _) = broadcast::channel(config.unhandled_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                scope,
                storage: SharedStorage::for_scope(scope),
                names: RwLock::new(config.names.clone()),
                unhandled,
            }),
        }
    }

    /// Storage scope fixed at construction.
    #[must_use]
    pub fn scope(&self) -> StorageScope {
        self.inner.scope
    }

    /// Current lifecycle event names.
    #[must_use]
    pub fn lifecycle_names(&self) -> EventNames {
        self.inner
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rename the error event. Applies to failures caught from now on.
    pub fn set_error_event_name(&self, name: impl Into<String>) {
        self.names_mut().error = name.into();
    }

    /// Rename the new-listener event. Applies to registrations from now on.
    pub fn set_new_listener_event_name(&self, name: impl Into<String>) {
        self.names_mut().new_listener = name.into();
    }

    /// Rename the remove-listener event. Applies to removals from now on.
    pub fn set_remove_listener_event_name(&self, name: impl Into<String>) {
        self.names_mut().remove_listener = name.into();
    }

    fn names_mut(&self) -> std::sync::RwLockWriteGuard<'_, EventNames> {
        self.inner
            .names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `listener` for every emit of `event`.
    pub fn on(&self, event: impl Into<String>, listener: Listener) -> ListenerId {
        self.register(event, listener, false)
    }

    /// Register `listener` for the next emit of `event` only.
    pub fn once(&self, event: impl Into<String>, listener: Listener) -> ListenerId {
        self.register(event, listener, true)
    }

    /// Register `listener` under `event`, optionally as a one-shot listener.
    ///
    /// Unless `event` is one of the lifecycle names, the new-listener event
    /// is emitted with `(event, listener)`.
    pub fn register(&self, event: impl Into<String>, listener: Listener, once: bool) -> ListenerId {
        let event = event.into();
        let index = self
            .inner
            .storage
            .lock()
            .insert(&event, listener.clone(), once);
        debug!(event = %event, index, once, "Listener registered");

        let names = self.lifecycle_names();
        if !names.is_reserved(&event) {
            self.emit(
                &names.new_listener,
                [EventArg::from(event.as_str()), EventArg::Listener(listener)],
            );
        }

        ListenerId::new(index, &event)
    }

    /// Schedule every live listener of `event` with `args`.
    ///
    /// Returns the number of invocations scheduled; emitting an event with
    /// no listeners is a no-op. One-shot listeners are consumed by the same
    /// lock acquisition that finds them, so concurrent emits run each of
    /// them at most once. The remove-listener event is emitted for each of
    /// them after every invocation is scheduled.
    ///
    /// A listener that is removed after being scheduled still runs for this
    /// emit.
    ///
    /// Outside a tokio runtime nothing can run: each scheduled invocation
    /// is reported as [`ListenerError::NoRuntime`] on the
    /// [unhandled channel](Self::subscribe_unhandled).
    pub fn emit(&self, event: &str, args: impl Into<EventArgs>) -> usize {
        let args = args.into();
        let live = self.inner.storage.lock().take_live(event);

        for (index, listener, _) in &live {
            trace!(event, index, "Scheduling listener");
            self.dispatch(event, listener.clone(), args.clone());
        }

        if live.iter().any(|(_, _, once)| *once) {
            let remove_event = self.lifecycle_names().remove_listener;
            for (index, listener, _) in live.iter().filter(|(_, _, once)| *once) {
                debug!(event, index, "One-shot listener consumed");
                self.emit(
                    &remove_event,
                    [EventArg::from(event), EventArg::Listener(listener.clone())],
                );
            }
        }

        live.len()
    }

    fn dispatch(&self, event: &str, listener: Listener, args: EventArgs) {
        let Ok(runtime) = Handle::try_current() else {
            self.report_unhandled(event, Arc::new(ListenerError::NoRuntime));
            return;
        };

        let emitter = self.clone();
        let event = event.to_string();
        runtime.spawn(async move {
            // Sync listeners run inside `invoke`, so it must happen under
            // `catch_unwind` too.
            let outcome = AssertUnwindSafe(async move { listener.invoke(args).await })
                .catch_unwind()
                .await;

            let failure = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(e)) => ListenerError::Failed(e),
                Err(payload) => ListenerError::from_panic(&*payload),
            };
            emitter.handle_failure(&event, failure);
        });
    }

    fn handle_failure(&self, event: &str, failure: ListenerError) {
        let failure = Arc::new(failure);
        let error_event = self.lifecycle_names().error;

        // Failures of error listeners are never redirected, or a failing
        // error listener would feed itself forever.
        if event != error_event {
            let observed = self.inner.storage.lock().live_count(&error_event) > 0;
            if observed {
                debug!(event, error = %failure, "Redirecting listener failure");
                self.emit(
                    &error_event,
                    [EventArg::Error(failure), EventArg::from(event)],
                );
                return;
            }
        }

        self.report_unhandled(event, failure);
    }

    fn report_unhandled(&self, event: &str, failure: Arc<ListenerError>) {
        error!(event, error = %failure, "Unhandled listener failure");
        let _ = self.inner.unhandled.send(UnhandledFailure {
            event: event.to_string(),
            error: failure,
            occurred_at: Utc::now(),
        });
    }

    /// Receive failures that no error-event listener observed.
    #[must_use]
    pub fn subscribe_unhandled(&self) -> broadcast::Receiver<UnhandledFailure> {
        self.inner.unhandled.subscribe()
    }

    /// Remove the listener identified by `id`. Unknown, stale and malformed
    /// ids are ignored.
    pub fn remove_listener_by_id(&self, id: impl AsRef<str>) {
        self.remove_all_listeners_by_id([id]);
    }

    /// Remove each listener in `ids`, in order.
    ///
    /// Every removal that vacates a slot emits the remove-listener event
    /// with `(eventName, listener)`; removing an already vacated slot emits
    /// nothing.
    pub fn remove_all_listeners_by_id<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in ids {
            let raw = raw.as_ref();
            let id = match ListenerId::parse(raw) {
                Ok(id) => id,
                Err(e) => {
                    debug!(id = raw, error = %e, "Ignoring malformed listener id");
                    continue;
                },
            };

            let removed = self
                .inner
                .storage
                .lock()
                .remove(id.event_name(), id.index());
            let Some(listener) = removed else {
                trace!(id = %id, "Listener already removed");
                continue;
            };

            debug!(id = %id, "Listener removed");
            let remove_event = self.lifecycle_names().remove_listener;
            self.emit(
                &remove_event,
                [EventArg::from(id.event_name()), EventArg::Listener(listener)],
            );
        }
    }

    /// Remove the first registration of `listener` under `event`.
    ///
    /// Matching is by identity (see [`Listener::ptr_eq`]) and only considers
    /// registrations under `event`.
    pub fn remove_event_listener(&self, event: &str, listener: &Listener) {
        let found = self.inner.storage.lock().find(event, listener);
        if let Some(index) = found {
            self.remove_listener_by_id(ListenerId::new(index, event));
        }
    }

    /// Alias for [`remove_event_listener`](Self::remove_event_listener).
    pub fn off(&self, event: &str, listener: &Listener) {
        self.remove_event_listener(event, listener);
    }

    /// Remove every listener registered under `event`.
    pub fn remove_all_event_listeners(&self, event: &str) {
        let ids: Vec<ListenerId> = self
            .inner
            .storage
            .lock()
            .indices(event)
            .into_iter()
            .map(|index| ListenerId::new(index, event))
            .collect();
        self.remove_all_listeners_by_id(&ids);
    }

    /// Number of live listeners registered under `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.storage.lock().live_count(event)
    }

    /// Names of events with at least one live listener, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.inner.storage.lock().event_names()
    }
}

impl Default for PandaEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PandaEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PandaEvents")
            .field("scope", &self.inner.scope)
            .field("names", &self.lifecycle_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_args;
    use panda_test::{DEFAULT_WAIT as WAIT, settle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        let listener = Listener::new(move |_| {
            clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (count, listener)
    }

    fn forward(tx: mpsc::UnboundedSender<EventArgs>) -> Listener {
        Listener::new(move |args| {
            tx.send(args)?;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_encode_event() {
        let events = PandaEvents::new();
        let (_, listener) = counter();

        assert_eq!(events.on("sum", listener.clone()).as_str(), "0@sum");
        assert_eq!(events.once("tick", listener.clone()).as_str(), "1@tick");
        assert_eq!(events.on("a@b", listener).as_str(), "2@a@b");
    }

    #[tokio::test]
    async fn test_emit_passes_args() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("sum", forward(tx));

        assert_eq!(events.emit("sum", event_args![2, 3]), 1);

        let args = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(args.as_i64(0), Some(2));
        assert_eq!(args.as_i64(1), Some(3));
    }

    #[tokio::test]
    async fn test_emit_without_listeners_is_noop() {
        let events = PandaEvents::new();
        assert_eq!(events.emit("nobody", event_args![]), 0);
    }

    #[tokio::test]
    async fn test_emit_is_deferred() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        events.on("x", listener);

        events.emit("x", event_args![]);
        // Nothing has run yet: the current-thread runtime has not been
        // yielded to.
        assert_eq!(count.load(Ordering::SeqCst), 0);

        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listeners_scheduled_in_registration_order() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for label in ["first", "second", "third"] {
            let tx = tx.clone();
            events.on(
                "ordered",
                Listener::new(move |_| {
                    tx.send(label)?;
                    Ok(())
                }),
            );
        }

        events.emit("ordered", event_args![]);
        settle().await;

        let mut seen = Vec::new();
        while let Ok(label) = rx.try_recv() {
            seen.push(label);
        }
        assert_eq!(seen, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_once_fires_once() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        events.once("x", listener);

        events.emit("x", event_args![]);
        events.emit("x", event_args![]);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(events.listener_count("x"), 0);
    }

    #[tokio::test]
    async fn test_once_interleaved_with_regular_listeners() {
        let events = PandaEvents::new();
        let (regular_before, before) = counter();
        let (one_shot, once) = counter();
        let (regular_after, after) = counter();

        events.on("x", before);
        events.once("x", once);
        events.on("x", after);

        assert_eq!(events.emit("x", event_args![]), 3);
        assert_eq!(events.emit("x", event_args![]), 2);
        settle().await;

        assert_eq!(regular_before.load(Ordering::SeqCst), 2);
        assert_eq!(one_shot.load(Ordering::SeqCst), 1);
        assert_eq!(regular_after.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        let id = events.on("x", listener);

        events.remove_listener_by_id(&id);
        events.remove_listener_by_id(&id);
        events.emit("x", event_args![]);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remove_malformed_ids_is_noop() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        events.on("x", listener);

        events.remove_all_listeners_by_id(["x", "@x", "nope@x", "99@x"]);
        events.emit("x", event_args![]);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_off_matches_identity() {
        let events = PandaEvents::new();
        let (kept_count, kept) = counter();
        let (removed_count, removed) = counter();

        events.on("y", kept);
        events.on("y", removed.clone());
        events.off("y", &removed);
        events.emit("y", event_args![]);
        settle().await;

        assert_eq!(kept_count.load(Ordering::SeqCst), 1);
        assert_eq!(removed_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_off_ignores_other_events() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        events.on("a", listener.clone());

        events.off("b", &listener);
        events.emit("a", event_args![]);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(events.listener_count("a"), 1);
    }

    #[tokio::test]
    async fn test_off_removes_first_registration_only() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        events.on("a", listener.clone());
        events.on("a", listener.clone());

        events.off("a", &listener);
        events.emit("a", event_args![]);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_all_event_listeners() {
        let events = PandaEvents::new();
        let (a_count, a) = counter();
        let (b_count, b) = counter();
        events.on("a", a.clone());
        events.once("a", a);
        events.on("b", b);

        events.remove_all_event_listeners("a");
        events.emit("a", event_args![]);
        events.emit("b", event_args![]);
        settle().await;

        assert_eq!(a_count.load(Ordering::SeqCst), 0);
        assert_eq!(b_count.load(Ordering::SeqCst), 1);
        assert_eq!(events.event_names(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_new_listener_event() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("newListener", forward(tx));

        let (_, listener) = counter();
        events.on("X", listener.clone());
        // Lifecycle names never announce themselves.
        events.on("error", Listener::new(|_| Ok(())));
        events.on("removeListener", Listener::new(|_| Ok(())));
        settle().await;

        let args = rx.try_recv().unwrap();
        assert_eq!(args.as_str(0), Some("X"));
        assert!(args.listener(1).is_some_and(|l| l.ptr_eq(&listener)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_listener_event_fires_once() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("removeListener", forward(tx));

        let (_, listener) = counter();
        let id = events.on("X", listener.clone());
        events.remove_listener_by_id(&id);
        events.remove_listener_by_id(&id);
        settle().await;

        let args = rx.try_recv().unwrap();
        assert_eq!(args.as_str(0), Some("X"));
        assert!(args.listener(1).is_some_and(|l| l.ptr_eq(&listener)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_once_consumption_emits_remove_listener() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("removeListener", forward(tx));

        let (_, listener) = counter();
        events.once("X", listener);
        events.emit("X", event_args![]);
        settle().await;

        let args = rx.try_recv().unwrap();
        assert_eq!(args.as_str(0), Some("X"));
    }

    #[tokio::test]
    async fn test_failure_redirected_to_error_event() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("error", forward(tx));
        events.on("X", Listener::new(|_| anyhow::bail!("bad thing")));

        events.emit("X", event_args![]);
        let args = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        assert_eq!(args.error(0).map(ToString::to_string).as_deref(), Some("bad thing"));
        assert_eq!(args.as_str(1), Some("X"));
    }

    #[tokio::test]
    async fn test_panic_redirected_to_error_event() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("error", forward(tx));
        events.on("X", Listener::new(|_| panic!("listener exploded")));

        events.emit("X", event_args![]);
        let args = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        let failure = args.error(0).unwrap();
        assert!(failure.is_panic());
        assert_eq!(failure.to_string(), "listener panicked: listener exploded");
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        let mut unhandled = events.subscribe_unhandled();

        events.on("X", Listener::new(|_| anyhow::bail!("first fails")));
        events.on("X", listener);

        assert_eq!(events.emit("X", event_args![]), 2);
        let failure = timeout(WAIT, unhandled.recv()).await.unwrap().unwrap();
        settle().await;

        assert_eq!(failure.event, "X");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unhandled_when_no_error_listener() {
        let events = PandaEvents::new();
        let mut unhandled = events.subscribe_unhandled();
        events.on("X", Listener::new(|_| anyhow::bail!("nobody listens")));

        events.emit("X", event_args![]);
        let failure = timeout(WAIT, unhandled.recv()).await.unwrap().unwrap();

        assert_eq!(failure.event, "X");
        assert_eq!(failure.error.to_string(), "nobody listens");
    }

    #[tokio::test]
    async fn test_failing_error_listener_is_not_redirected() {
        let events = PandaEvents::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let mut unhandled = events.subscribe_unhandled();

        events.on(
            "error",
            Listener::new(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("error handler failed")
            }),
        );
        events.on("X", Listener::new(|_| anyhow::bail!("original")));

        events.emit("X", event_args![]);
        let failure = timeout(WAIT, unhandled.recv()).await.unwrap().unwrap();
        settle().await;

        assert_eq!(failure.event, "error");
        assert_eq!(failure.error.to_string(), "error handler failed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_renamed_lifecycle_events() {
        let events = PandaEvents::new();
        events.set_error_event_name("failure");
        events.set_new_listener_event_name("added");
        events.set_remove_listener_event_name("dropped");

        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("added", forward(tx.clone()));
        events.on("dropped", forward(tx.clone()));
        events.on("failure", forward(tx));

        // The old names are now ordinary events.
        let id = events.on("newListener", Listener::new(|_| anyhow::bail!("boom")));
        events.emit("newListener", event_args![]);
        events.remove_listener_by_id(&id);
        settle().await;

        let mut kinds = Vec::new();
        while let Ok(args) = rx.try_recv() {
            let kind = if args.error(0).is_some() {
                "failure"
            } else {
                args.as_str(0).unwrap_or_default()
            };
            kinds.push(kind.to_string());
        }
        kinds.sort_unstable();
        assert_eq!(kinds, vec!["failure", "newListener", "newListener"]);
        assert_eq!(events.lifecycle_names().error, "failure");
    }

    #[tokio::test]
    async fn test_rename_is_not_retroactive() {
        let events = PandaEvents::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        events.on("newListener", forward(tx));

        events.on("before", Listener::new(|_| Ok(())));
        events.set_new_listener_event_name("added");
        events.on("after", Listener::new(|_| Ok(())));
        settle().await;

        let args = rx.try_recv().unwrap();
        assert_eq!(args.as_str(0), Some("before"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_listener_removed_after_scheduling_still_runs() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        let id = events.on("x", listener);

        events.emit("x", event_args![]);
        events.remove_listener_by_id(&id);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listener_can_reenter_emitter() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let reentrant = {
            let events = events.clone();
            Listener::new(move |_| {
                events.on("late", listener.clone());
                events.remove_all_event_listeners("first");
                events.emit("late", event_args![]);
                tx.send(())?;
                Ok(())
            })
        };
        events.on("first", reentrant);

        events.emit("first", event_args![]);
        timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(events.listener_count("first"), 0);
    }

    #[tokio::test]
    async fn test_remove_by_id_with_wrong_event_vacates_slot() {
        let events = PandaEvents::new();
        let (count, listener) = counter();
        events.on("a", listener);

        events.remove_listener_by_id("0@b");
        events.emit("a", event_args![]);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(events.listener_count("a"), 0);
    }

    #[tokio::test]
    async fn test_private_emitters_do_not_share() {
        let first = PandaEvents::new();
        let second = PandaEvents::with_options(EventOptions { global: false });
        let (count, listener) = counter();

        first.on("private-share-check", listener);
        assert_eq!(second.emit("private-share-check", event_args![]), 0);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let events = PandaEvents::new();
        let clone = events.clone();
        let (count, listener) = counter();

        events.on("x", listener);
        assert_eq!(clone.emit("x", event_args![]), 1);
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(clone.scope(), StorageScope::Private);
    }

    #[test]
    fn test_registration_outside_runtime_reports_unhandled() {
        let events = PandaEvents::new();
        let mut unhandled = events.subscribe_unhandled();
        let (announced, announcer) = counter();

        events.on("newListener", announcer);
        let (_, listener) = counter();
        let id = events.on("x", listener.clone());
        events.off("x", &listener);
        events.remove_listener_by_id(&id);

        let failure = unhandled.try_recv().unwrap();
        assert_eq!(failure.event, "newListener");
        assert!(matches!(*failure.error, ListenerError::NoRuntime));
        assert!(unhandled.try_recv().is_err());
        assert_eq!(announced.load(Ordering::SeqCst), 0);
        assert_eq!(events.listener_count("x"), 0);
    }

    #[test]
    fn test_emit_outside_runtime_still_consumes_once() {
        let events = PandaEvents::new();
        let mut unhandled = events.subscribe_unhandled();
        let (count, listener) = counter();
        events.once("x", listener);

        assert_eq!(events.emit("x", event_args![]), 1);
        assert_eq!(events.emit("x", event_args![]), 0);

        let failure = unhandled.try_recv().unwrap();
        assert_eq!(failure.event, "x");
        assert!(unhandled.try_recv().is_err());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_debug_output() {
        let events = PandaEvents::new();
        let rendered = format!("{events:?}");
        assert!(rendered.contains("Private"));
        assert!(rendered.contains("newListener"));
    }
}
