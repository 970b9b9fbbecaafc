//! Core daemon process: startup, shutdown, and main event loop.
//!
//! The daemon owns every resource it touches: the LED controller (and with
//! it the GPIO line), the command socket and the connected client. The main
//! loop races each blocking accept/read against a shutdown future, so a
//! SIGINT, a SIGTERM or an in-process request ends the loop wherever it is
//! blocked, and the resources are then released in one place.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use torchd_config::AppConfig;

use crate::hardware::{CdevLineProvider, HardwareError, I2cBus, LineProvider, LinuxI2cBus};
use crate::led::{LedController, LedState};
use crate::server::{CommandServer, serve_connection};

/// Shutdown signal sent via broadcast channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// Cloneable handle that asks a running daemon to stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<ShutdownSignal>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(ShutdownSignal);
    }
}

/// Why the main loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "SIGINT"),
            ShutdownReason::Terminate => write!(f, "SIGTERM"),
            ShutdownReason::Requested => write!(f, "shutdown requested"),
        }
    }
}

/// The torchd daemon.
pub struct Daemon<P: LineProvider, B: I2cBus> {
    config: AppConfig,
    controller: LedController<P, B>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    shutdown_rx: broadcast::Receiver<ShutdownSignal>,
}

impl Daemon<CdevLineProvider, LinuxI2cBus> {
    /// Create a daemon driving the real GPIO chip and I2C adapter named in
    /// the configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let provider = CdevLineProvider::from_config(&config.gpio);
        let bus = LinuxI2cBus::new(&config.i2c.bus);
        Self::new(config, provider, bus)
    }
}

impl<P: LineProvider, B: I2cBus> Daemon<P, B> {
    /// Create a new daemon instance over the given hardware.
    pub fn new(config: AppConfig, provider: P, bus: B) -> Self {
        let controller = LedController::new(provider, bus, &config.i2c);
        // The receiver is created up front so a shutdown requested before
        // `run` is still seen.
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            config,
            controller,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Check that the enable line can be requested.
    pub fn probe(&self) -> Result<(), DaemonError> {
        self.controller.probe().map_err(DaemonError::Probe)
    }

    /// Probe the hardware, bind the command socket and serve clients until a
    /// shutdown signal is received.
    ///
    /// Startup failures are returned as errors. Hardware failures while
    /// serving are logged and never end the loop.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        info!(
            version = crate::build_info::LONG_VERSION,
            built = crate::build_info::BUILD_TIMESTAMP,
            socket = %self.config.daemon.socket_path.display(),
            gpio = %self.config.gpio.chip.display(),
            line = self.config.gpio.line,
            i2c = %self.config.i2c.bus.display(),
            "torchd starting"
        );

        self.probe()?;

        let mut shutdown =
            ShutdownListener::install(&mut self.shutdown_rx).map_err(DaemonError::Signal)?;
        let server = CommandServer::bind(&self.config.daemon)?;

        let reason = serve_until_shutdown(&mut self.controller, &server, &mut shutdown).await;
        info!(%reason, "Shutting down");

        self.controller.shutdown();
        drop(server);

        info!("Daemon stopped");
        Ok(())
    }

    /// Request a graceful shutdown of the daemon.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    /// Get a handle that can stop the daemon from elsewhere.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Current LED state.
    pub fn led_state(&self) -> LedState {
        self.controller.state()
    }

    /// Whether the GPIO enable line is currently requested.
    pub fn line_held(&self) -> bool {
        self.controller.line_held()
    }

    /// Get a reference to the daemon's configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Accept and serve clients one at a time until shutdown.
///
/// A client still connected when shutdown arrives is dropped with the
/// future that was reading from it.
async fn serve_until_shutdown<P: LineProvider, B: I2cBus>(
    controller: &mut LedController<P, B>,
    server: &CommandServer,
    shutdown: &mut ShutdownListener<'_>,
) -> ShutdownReason {
    loop {
        let mut stream = tokio::select! {
            reason = shutdown.recv() => return reason,
            accepted = server.accept() => match accepted {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "Failed to accept client connection");
                    match back_off(shutdown, ACCEPT_RETRY_DELAY).await {
                        Some(reason) => return reason,
                        None => continue,
                    }
                }
            },
        };

        debug!("Client connected");
        tokio::select! {
            reason = shutdown.recv() => return reason,
            served = serve_connection(&mut stream, controller) => match served {
                Ok(handled) => debug!(commands = handled, "Client disconnected"),
                Err(e) => warn!(error = %e, "Client connection failed"),
            },
        }
    }
}

/// Pause before retrying a failed accept.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Sleep for `delay` unless shutdown arrives first, in which case its reason
/// is returned.
async fn back_off(
    shutdown: &mut ShutdownListener<'_>,
    delay: Duration,
) -> Option<ShutdownReason> {
    tokio::select! {
        reason = shutdown.recv() => Some(reason),
        _ = tokio::time::sleep(delay) => None,
    }
}

/// Process-signal and in-process shutdown sources, merged.
struct ShutdownListener<'a> {
    requested: &'a mut broadcast::Receiver<ShutdownSignal>,
    interrupt: Signal,
    terminate: Signal,
}

impl<'a> ShutdownListener<'a> {
    /// Install SIGINT and SIGTERM handlers. From here on those signals no
    /// longer kill the process; they are delivered to `recv`.
    fn install(requested: &'a mut broadcast::Receiver<ShutdownSignal>) -> io::Result<Self> {
        Ok(Self {
            requested,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = self.requested.recv() => ShutdownReason::Requested,
            _ = self.interrupt.recv() => ShutdownReason::Interrupt,
            _ = self.terminate.recv() => ShutdownReason::Terminate,
        }
    }
}

/// Errors from the daemon runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("hardware probe failed: {0}")]
    Probe(#[source] HardwareError),

    #[error("socket setup failed: could not {action} {}: {source}", .path.display())]
    SocketSetup {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),
}

impl DaemonError {
    pub fn socket_setup(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::SocketSetup {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}
