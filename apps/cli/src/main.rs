use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pcremote_core::config::DEFAULT_CONFIG_FILE;
use pcremote_core::protocol::DEFAULT_TIMEOUT_SECS;
use pcremote_core::{Dispatcher, RemoteConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Network remote control client", long_about = None)]
struct Args {
    /// Name of the device to operate
    device: String,

    /// Name of the command to send
    command: String,

    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Network timeout in seconds (0 waits forever)
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS, allow_negative_numbers = true)]
    timeout: i64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {e}");
    }

    match run(&args) {
        Ok(true) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    let config = RemoteConfig::load_from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let dispatcher = Dispatcher::new(config);
    Ok(dispatcher.send_with_timeout(&args.device, &args.command, args.timeout))
}
