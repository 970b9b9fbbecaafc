//! Command client that writes one token to the daemon socket.
//!
//! The protocol has no reply, so a successful send only means the daemon's
//! socket accepted the bytes; whether the hardware followed is not visible
//! from here.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::debug;

use crate::protocol::Command;

/// Errors from the command client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("daemon is not running (socket not found at {})", .0.display())]
    NotRunning(PathBuf),

    #[error("failed to connect to daemon socket at {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write command to daemon socket: {0}")]
    Write(#[source] std::io::Error),
}

/// Client for sending commands to torchd via its Unix socket.
#[derive(Debug, Clone)]
pub struct CommandClient {
    socket_path: PathBuf,
}

impl CommandClient {
    /// Create a new client targeting the given socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if the daemon socket exists (daemon is likely running).
    pub fn daemon_available(&self) -> bool {
        self.socket_path.exists()
    }

    /// Connect, write the command token in full, and hang up.
    pub async fn send(&self, command: Command) -> Result<(), ClientError> {
        if !self.daemon_available() {
            return Err(ClientError::NotRunning(self.socket_path.clone()));
        }

        let mut stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|e| ClientError::Connect {
                    path: self.socket_path.clone(),
                    source: e,
                })?;

        stream
            .write_all(command.as_str().as_bytes())
            .await
            .map_err(ClientError::Write)?;
        stream.shutdown().await.map_err(ClientError::Write)?;

        debug!(%command, socket = %self.socket_path.display(), "Command sent");
        Ok(())
    }
}
