//! Panda Test - shared test utilities for the panda-events workspace.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! panda-test.workspace = true
//! ```
//!
//! Then record listener calls and wait for them:
//!
//! ```rust,ignore
//! use panda_test::{CallLog, init_test_logging};
//!
//! #[tokio::test]
//! async fn test_listener_runs() {
//!     init_test_logging();
//!     let log = CallLog::new();
//!     let recorder = log.clone();
//!     events.on("x", Listener::new(move |_| { recorder.record("x"); Ok(()) }));
//!
//!     events.emit("x", event_args![]);
//!     assert_eq!(log.wait_for(1).await, vec!["x"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod logging;
pub mod recorder;

pub use logging::init_test_logging;
pub use recorder::{CallLog, DEFAULT_WAIT, settle};
