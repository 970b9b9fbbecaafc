#![deny(unsafe_code)]

//! torchd core: the flash LED daemon runtime.
//!
//! Drives the camera-flash controller of a phone (an ADP1653 on the Nokia
//! N900) through a GPIO enable line and an I2C brightness register, and
//! serves plain-text `off` / `torch` / `red` commands over a Unix socket.
//! The `torch` client and the `torchd` daemon binaries are thin wrappers
//! around this crate.

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Command client used by the `torch` binary.
pub mod client;
/// Daemon lifecycle: probe, serve, shut down on signal.
pub mod daemon;
/// GPIO line and I2C register access.
pub mod hardware;
/// LED state machine.
pub mod led;
/// Tracing subscriber setup.
pub mod logging;
/// In-memory hardware for tests.
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// Command tokens exchanged over the socket.
pub mod protocol;
/// Unix socket listener and per-connection command loop.
pub mod server;

pub use client::CommandClient;
pub use daemon::{Daemon, DaemonError, ShutdownHandle};
pub use hardware::HardwareError;
pub use led::{LedController, LedState};
pub use protocol::Command;
pub use server::CommandServer;
