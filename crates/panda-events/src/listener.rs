//! Listener callbacks and the arguments they receive.

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::ListenerError;

type ListenerFn = dyn Fn(EventArgs) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A registered callback.
///
/// Cloning a `Listener` is cheap and yields the *same* listener: identity is
/// the shared allocation, so keep a clone around if you need to pass it to
/// [`PandaEvents::off`](crate::PandaEvents::off) later.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerFn>,
}

impl Listener {
    /// Wrap a synchronous callback.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(EventArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |args| {
                let result = f(args);
                futures::future::ready(result).boxed()
            }),
        }
    }

    /// Wrap an asynchronous callback. The returned future is awaited only to
    /// observe its failure; its output is otherwise ignored.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(EventArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |args| f(args).boxed()),
        }
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn invoke(&self, args: EventArgs) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.inner)(args)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// A single positional argument of an emitted event.
#[derive(Debug, Clone)]
pub enum EventArg {
    /// Plain data.
    Value(Value),
    /// A listener, as carried by the new-listener and remove-listener events.
    Listener(Listener),
    /// A caught listener failure, as carried by the error event.
    Error(Arc<ListenerError>),
}

impl EventArg {
    /// The JSON value, if this argument is plain data.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The listener, if this argument carries one.
    #[must_use]
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            Self::Listener(l) => Some(l),
            _ => None,
        }
    }

    /// The failure, if this argument carries one.
    #[must_use]
    pub fn as_error(&self) -> Option<&Arc<ListenerError>> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EventArg {
                fn from(v: $ty) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_value!(bool, i32, i64, u32, u64, f64, &str, String);

impl From<Value> for EventArg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Listener> for EventArg {
    fn from(l: Listener) -> Self {
        Self::Listener(l)
    }
}

impl From<Arc<ListenerError>> for EventArg {
    fn from(e: Arc<ListenerError>) -> Self {
        Self::Error(e)
    }
}

impl From<ListenerError> for EventArg {
    fn from(e: ListenerError) -> Self {
        Self::Error(Arc::new(e))
    }
}

/// The ordered, immutable argument list handed to every listener of one emit.
///
/// Shared between all listeners scheduled by the same emit.
#[derive(Debug, Clone)]
pub struct EventArgs(Arc<[EventArg]>);

impl EventArgs {
    /// No arguments.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Plain value at `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index).and_then(EventArg::as_value)
    }

    /// String at `index`.
    #[must_use]
    pub fn as_str(&self, index: usize) -> Option<&str> {
        self.value(index).and_then(Value::as_str)
    }

    /// Signed integer at `index`.
    #[must_use]
    pub fn as_i64(&self, index: usize) -> Option<i64> {
        self.value(index).and_then(Value::as_i64)
    }

    /// Float at `index`.
    #[must_use]
    pub fn as_f64(&self, index: usize) -> Option<f64> {
        self.value(index).and_then(Value::as_f64)
    }

    /// Boolean at `index`.
    #[must_use]
    pub fn as_bool(&self, index: usize) -> Option<bool> {
        self.value(index).and_then(Value::as_bool)
    }

    /// Listener at `index`.
    #[must_use]
    pub fn listener(&self, index: usize) -> Option<&Listener> {
        self.0.get(index).and_then(EventArg::as_listener)
    }

    /// Failure at `index`.
    #[must_use]
    pub fn error(&self, index: usize) -> Option<&Arc<ListenerError>> {
        self.0.get(index).and_then(EventArg::as_error)
    }
}

impl Default for EventArgs {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for EventArgs {
    type Target = [EventArg];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<EventArg>> for EventArgs {
    fn from(args: Vec<EventArg>) -> Self {
        Self(Arc::from(args))
    }
}

impl<const N: usize> From<[EventArg; N]> for EventArgs {
    fn from(args: [EventArg; N]) -> Self {
        Self(Arc::from(Vec::from(args)))
    }
}

/// Build an [`EventArgs`] from a list of expressions convertible into
/// [`EventArg`].
///
/// ```rust
/// use panda_events::event_args;
///
/// let args = event_args![2, "three", true];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args.as_i64(0), Some(2));
/// assert_eq!(args.as_str(1), Some("three"));
/// ```
#[macro_export]
macro_rules! event_args {
    () => {
        $crate::EventArgs::empty()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::EventArgs::from(::std::vec![$($crate::EventArg::from($arg)),+])
    };
}
