#![deny(unsafe_code)]

//! Shared test utilities for the torchd workspace.
//!
//! Provides a config builder, a daemon harness running over mock hardware,
//! polling helpers and tracing setup, so integration tests stay short.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! torchd-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod tracing_setup;
pub mod wait;

pub use config::TestConfigBuilder;
pub use daemon::{MockDaemon, TestDaemon};
pub use torchd_core::mock::{I2cWrite, MockHardware, MockState};
pub use wait::eventually;
