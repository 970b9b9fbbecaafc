#![deny(unsafe_code)]

//! torch: send one command to the torchd daemon.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use torchd_config::DEFAULT_SOCKET_PATH;
use torchd_core::{Command, CommandClient, build_info};

/// Switch the flash LED off, to torch mode or to the red indicator.
#[derive(Parser)]
#[command(name = "torch", version = build_info::LONG_VERSION, about, long_about = None)]
struct Cli {
    /// Command to send.
    #[arg(value_name = "off|torch|red")]
    command: Command,

    /// Path of the daemon's command socket.
    #[arg(long, env = "TORCHD_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version land here too.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match CommandClient::new(cli.socket).send(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("torch: {e}");
            ExitCode::FAILURE
        }
    }
}
