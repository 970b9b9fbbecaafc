//! Tracing setup for tests.
//!
//! [`TestDaemon`](crate::TestDaemon) calls [`init_test_tracing`] itself, so
//! daemon logs show up in the output of any failing harness test.

use tracing_subscriber::EnvFilter;

/// Daemon-side events at debug, everything else at warn.
const DEFAULT_TEST_FILTER: &str = "torchd_core=debug,warn";

/// Route tracing output through the test harness's captured writer.
///
/// `RUST_LOG` overrides the default filter. Only the first call in a test
/// binary installs the subscriber; later calls do nothing.
pub fn init_test_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init();
}
