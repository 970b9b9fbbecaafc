//! Daemon test harness.
//!
//! [`TestDaemon`] runs a [`Daemon`] over [`MockHardware`] on a background
//! task, with its command socket inside an owned temp directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

use torchd_config::AppConfig;
use torchd_core::mock::{MockHardware, MockI2cBus, MockLineProvider, MockState};
use torchd_core::{Daemon, DaemonError, ShutdownHandle};

use crate::config::TestConfigBuilder;
use crate::tracing_setup::init_test_tracing;
use crate::wait::{DEFAULT_TIMEOUT, eventually};

/// A daemon running on mock hardware.
pub type MockDaemon = Daemon<MockLineProvider, MockI2cBus>;

/// A test-scoped running daemon.
///
/// The temp directory holding the socket is deleted when this value is
/// dropped, even on panic.
pub struct TestDaemon {
    pub hardware: MockHardware,
    pub socket_path: PathBuf,
    shutdown: ShutdownHandle,
    task: JoinHandle<(MockDaemon, Result<(), DaemonError>)>,
    _temp_dir: TempDir,
}

impl TestDaemon {
    /// Start a daemon with default settings and fresh mock hardware.
    pub async fn start() -> Self {
        Self::start_with(|builder| builder, MockHardware::new()).await
    }

    /// Start a daemon over `hardware`, letting `configure` adjust the
    /// config. The socket path is always placed in the temp directory.
    pub async fn start_with(
        configure: impl FnOnce(TestConfigBuilder) -> TestConfigBuilder,
        hardware: MockHardware,
    ) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("torchd.sock");
        let config = configure(TestConfigBuilder::new())
            .socket_path(&socket_path)
            .build();
        Self::start_in(temp_dir, config, hardware).await
    }

    /// Start a daemon with a config whose socket path the caller has
    /// already placed inside `temp_dir`.
    pub async fn start_in(temp_dir: TempDir, config: AppConfig, hardware: MockHardware) -> Self {
        init_test_tracing();

        let socket_path = config.daemon.socket_path.clone();
        let mut daemon = Daemon::new(config, hardware.line_provider(), hardware.bus());
        let shutdown = daemon.shutdown_handle();
        let task = tokio::spawn(async move {
            let result = daemon.run().await;
            (daemon, result)
        });

        let test_daemon = Self {
            hardware,
            socket_path,
            shutdown,
            task,
            _temp_dir: temp_dir,
        };
        test_daemon.wait_until_listening().await;
        test_daemon
    }

    async fn wait_until_listening(&self) {
        for _ in 0..500 {
            if UnixStream::connect(&self.socket_path).await.is_ok() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!(
            "daemon did not start listening on {}",
            self.socket_path.display()
        );
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Open a connection, write `payload` in one piece and hang up.
    pub async fn send_raw(&self, payload: &[u8]) {
        let mut stream = self.connect().await;
        stream
            .write_all(payload)
            .await
            .expect("failed to write to daemon socket");
        stream.shutdown().await.expect("failed to close connection");
    }

    /// Send a single command token on its own connection.
    pub async fn send(&self, token: &str) {
        self.send_raw(token.as_bytes()).await;
    }

    /// Open a connection that the caller keeps and writes to.
    pub async fn connect(&self) -> UnixStream {
        UnixStream::connect(&self.socket_path)
            .await
            .expect("failed to connect to daemon socket")
    }

    /// Wait until the mock hardware satisfies `condition`.
    pub async fn wait_for(&self, condition: impl Fn(&MockState) -> bool) -> bool {
        let hardware = self.hardware.clone();
        eventually(move || condition(&hardware.snapshot())).await
    }

    /// Ask the daemon to stop without waiting for it.
    pub fn request_shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Wait for the daemon task to finish on its own, e.g. after a signal.
    ///
    /// The temp directory stays alive, so the socket path can still be
    /// inspected afterwards. Call at most once.
    pub async fn join(&mut self) -> (MockDaemon, Result<(), DaemonError>) {
        tokio::time::timeout(DEFAULT_TIMEOUT, &mut self.task)
            .await
            .expect("daemon did not stop in time")
            .expect("daemon task panicked")
    }

    /// Request shutdown and wait for the daemon task to finish.
    pub async fn stop(mut self) -> (MockDaemon, Result<(), DaemonError>) {
        self.request_shutdown();
        self.join().await
    }
}
