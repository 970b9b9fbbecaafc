//! Tracing subscriber setup shared by the `torchd` and `torch` binaries.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Resolve the log filter: each `-v` raises the configured level one step,
/// up to `trace`.
pub fn filter_for(configured: &str, verbose: u8) -> String {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

    let base = LEVELS
        .iter()
        .position(|level| *level == configured)
        .unwrap_or(2);
    let index = (base + usize::from(verbose)).min(LEVELS.len() - 1);
    LEVELS[index].to_string()
}

/// Install a `fmt` subscriber writing to stderr. `RUST_LOG`, when set,
/// overrides `default_filter`.
pub fn init(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
