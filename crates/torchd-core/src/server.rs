//! Command socket: a Unix listener served one connection at a time.
//!
//! The daemon binds a stream socket at a well-known path and reads raw
//! command tokens from each client until it hangs up. Connections are
//! strictly sequential: the next one is accepted only after the current one
//! has closed.

use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use torchd_config::DaemonConfig;

use crate::daemon::DaemonError;
use crate::hardware::{I2cBus, LineProvider};
use crate::led::LedController;
use crate::protocol::{Command, MAX_TOKEN_LEN};

/// A bound command socket. The socket file is removed when this is dropped.
#[derive(Debug)]
pub struct CommandServer {
    listener: UnixListener,
    path: PathBuf,
}

impl CommandServer {
    /// Bind the command socket described by `config`.
    ///
    /// Removes any file already at the path (a socket left behind by an
    /// earlier run), binds, then applies `config.socket_mode` so that
    /// unprivileged clients can connect. Must be called inside a tokio
    /// runtime.
    pub fn bind(config: &DaemonConfig) -> Result<Self, DaemonError> {
        let path = config.socket_path.clone();

        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed stale socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(DaemonError::socket_setup("remove stale file at", &path, e)),
        }

        let listener = UnixListener::bind(&path)
            .map_err(|e| DaemonError::socket_setup("bind", &path, e))?;
        let server = Self { listener, path };

        std::fs::set_permissions(&server.path, Permissions::from_mode(config.socket_mode))
            .map_err(|e| DaemonError::socket_setup("set permissions on", &server.path, e))?;

        info!(
            path = %server.path.display(),
            mode = format_args!("{:#o}", config.socket_mode),
            "Command socket listening"
        );
        Ok(server)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next client.
    pub async fn accept(&self) -> io::Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(stream)
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Socket file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove socket file"),
        }
    }
}

/// Read command tokens from one client until it hangs up, applying each to
/// the controller.
///
/// Each read of at most [`MAX_TOKEN_LEN`] bytes is one token. Unknown tokens
/// are dropped. Hardware failures are logged and leave the LED off; they do
/// not end the connection. Returns the number of recognised commands.
pub async fn serve_connection<R, P, B>(
    stream: &mut R,
    controller: &mut LedController<P, B>,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
    P: LineProvider,
    B: I2cBus,
{
    let mut buf = [0u8; MAX_TOKEN_LEN];
    let mut handled = 0;

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(handled);
        }

        let command = match Command::from_token(&buf[..n]) {
            Ok(command) => command,
            Err(e) => {
                debug!(token = %e.0, "Ignoring unrecognised token");
                continue;
            }
        };

        handled += 1;
        debug!(%command, "Command received");
        if let Err(e) = controller.apply(command) {
            warn!(%command, error = %e, "Hardware transition failed, LED left off");
        }
    }
}
