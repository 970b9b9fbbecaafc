//! Polling helpers.
//!
//! Clients get no reply from the daemon, so tests observe its effects by
//! polling the mock hardware until a condition holds.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// How long [`eventually`] waits before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it returns `true` or [`DEFAULT_TIMEOUT`] elapses.
/// Returns the final outcome.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + DEFAULT_TIMEOUT;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
