//! Test logging.

use std::sync::Once;

use panda_telemetry::{LogConfig, LogFormat, setup_logging};

static INIT: Once = Once::new();

/// Install a compact stderr subscriber once per test binary.
///
/// The level comes from `PANDA_TEST_LOG` (default `warn`), so
/// `PANDA_TEST_LOG=panda_events=trace cargo test` shows every dispatch.
/// Failure to install (another subscriber already set) is ignored.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let level = std::env::var("PANDA_TEST_LOG").unwrap_or_else(|_| "warn".to_string());
        let config = LogConfig::new(level)
            .with_format(LogFormat::Compact)
            .without_timestamps()
            .without_ansi();

        if let Err(e) = setup_logging(&config) {
            tracing::debug!(error = %e, "Test logging not installed");
        }
    });
}
