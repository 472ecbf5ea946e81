//! Panda Telemetry - logging setup for applications embedding `panda-events`.
//!
//! The emitter logs through `tracing`; this crate installs a
//! `tracing-subscriber` registry that renders those logs.
//!
//! # Example
//!
//! ```rust,no_run
//! use panda_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), panda_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("panda_events=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
