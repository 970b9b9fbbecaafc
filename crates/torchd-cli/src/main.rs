#![deny(unsafe_code)]

//! torchd, the flash LED daemon.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use torchd_config::AppConfig;
use torchd_core::{Daemon, build_info, logging};

/// Drive the camera flash LED as a torch or red indicator.
#[derive(Parser)]
#[command(name = "torchd", version = build_info::LONG_VERSION, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "/etc/torchd.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the hardware, then serve commands until SIGINT or SIGTERM.
    Run,

    /// Request and release the GPIO enable line once.
    Probe,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, found) = match load_config(&cli.config).await {
        Ok(loaded) => loaded,
        Err(e) => {
            // No config means no configured level; report at the default one.
            logging::init(&logging::filter_for("info", cli.verbose));
            return report(&e);
        }
    };
    logging::init(&logging::filter_for(&config.logging.level, cli.verbose));
    if !found {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let result = match cli.command {
        Commands::Run => cmd_run(config).await,
        Commands::Probe => cmd_probe(config),
        Commands::Config { show } => cmd_config(&cli.config, &config, show),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Log a fatal error once and turn it into the failure exit code.
fn report(e: &anyhow::Error) -> ExitCode {
    error!(error = %format!("{e:#}"), "torchd failed");
    ExitCode::FAILURE
}

async fn cmd_run(config: AppConfig) -> Result<()> {
    let mut daemon = Daemon::from_config(config);
    daemon.run().await?;
    Ok(())
}

fn cmd_probe(config: AppConfig) -> Result<()> {
    let line = format!("{} line {}", config.gpio.chip.display(), config.gpio.line);
    Daemon::from_config(config).probe()?;
    println!("GPIO {line} is available.");
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render configuration")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file, or the defaults when there is none. The flag says
/// whether a file was found.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}
