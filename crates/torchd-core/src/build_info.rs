//! Build metadata embedded by `build.rs`.
//!
//! Shown by `--version` on both binaries and logged when the daemon starts,
//! so a report from a phone identifies the exact build it came from.

/// The git commit hash at build time (short form), or `unknown` outside a
/// checkout.
pub const GIT_HASH: &str = env!("TORCHD_GIT_HASH");

/// The build timestamp as a Unix epoch string.
pub const BUILD_TIMESTAMP: &str = env!("TORCHD_BUILD_TIMESTAMP");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("TORCHD_BUILD_PROFILE");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version, git hash and profile, e.g. `0.1.0 (abc1234, release)`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TORCHD_GIT_HASH"),
    ", ",
    env!("TORCHD_BUILD_PROFILE"),
    ")"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_version_contains_parts() {
        assert!(LONG_VERSION.starts_with(VERSION));
        assert!(LONG_VERSION.contains(GIT_HASH));
        assert!(LONG_VERSION.ends_with(&format!("{BUILD_PROFILE})")));
    }

    #[test]
    fn test_build_timestamp_is_numeric() {
        assert!(BUILD_TIMESTAMP.parse::<u64>().is_ok());
    }

    #[test]
    fn test_git_hash_not_empty() {
        assert!(!GIT_HASH.is_empty());
    }

    #[test]
    fn test_build_profile() {
        // In test mode, profile is "debug"
        assert_eq!(BUILD_PROFILE, "debug");
    }
}
