//! Prelude module - commonly used types for convenient import.
//!
//! Use `use panda_events::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use panda_events::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let events = PandaEvents::with_options(EventOptions { global: false });
//! let id = events.on("tick", Listener::new(|_| Ok(())));
//!
//! events.emit("tick", event_args![1]);
//! events.remove_listener_by_id(&id);
//! assert_eq!(events.listener_count("tick"), 0);
//! # }
//! ```

// Emitter
pub use crate::{PandaEvents, StorageScope, UnhandledFailure};

// Listeners and arguments
pub use crate::{EventArg, EventArgs, Listener, ListenerId, event_args};

// Configuration
pub use crate::{EmitterConfig, EventNames, EventOptions};

// Errors
pub use crate::{EventError, EventResult, ListenerError};
