//! Panda Events - an in-process publish/subscribe event emitter.
//!
//! This crate provides:
//! - Named listeners registered with `on`/`once`, addressed by opaque ids
//! - Asynchronous, fire-and-forget dispatch on the tokio runtime
//! - Lifecycle events for listener registration and removal
//! - An error event that receives failures raised inside listeners
//! - Private or process-wide (global) listener storage
//!
//! # Architecture
//!
//! Listeners live in numbered slots. A slot is never reused: removing a
//! listener empties its slot, so the `<index>@<eventName>` id handed out at
//! registration always resolves, at worst to nothing. Each event name maps
//! to the slot indices registered under it, in registration order.
//!
//! Emitting an event spawns one task per live listener and returns
//! immediately. A listener that returns an error or panics is redirected to
//! the error event when that event has listeners, and published on the
//! unhandled-failure channel otherwise.
//!
//! # Example
//!
//! ```rust
//! use panda_events::{Listener, PandaEvents, event_args};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let events = PandaEvents::new();
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! events.once(
//!     "greet",
//!     Listener::new(move |args| {
//!         tx.send(format!("hello {}", args.as_str(0).unwrap_or("nobody")))?;
//!         Ok(())
//!     }),
//! );
//!
//! events.emit("greet", event_args!["panda"]);
//! events.emit("greet", event_args!["again"]);
//!
//! assert_eq!(rx.recv().await.as_deref(), Some("hello panda"));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod config;
mod emitter;
mod error;
mod id;
mod listener;
mod storage;

pub use config::{
    DEFAULT_ERROR_EVENT, DEFAULT_NEW_LISTENER_EVENT, DEFAULT_REMOVE_LISTENER_EVENT,
    DEFAULT_UNHANDLED_CAPACITY, EmitterConfig, EventNames, EventOptions,
};
pub use emitter::{PandaEvents, UnhandledFailure};
pub use error::{EventError, EventResult, ListenerError};
pub use id::ListenerId;
pub use listener::{EventArg, EventArgs, Listener};
pub use storage::StorageScope;
