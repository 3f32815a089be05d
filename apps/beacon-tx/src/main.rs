use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use beacon_codec::{payload, CodecError};
use beacon_controller::BeaconController;
#[cfg(feature = "bluez")]
use beacon_radio::bluez::{BluezRadio, BluezRadioConfig};
use beacon_radio::{InMemoryRadio, RadioAdapter, RadioError};

use crate::config::BeaconConfig;

#[derive(Parser)]
#[command(author, version, about = "Transmit-only iBeacon advertiser", long_about = None)]
struct Cli {
    /// Path to a TOML/YAML/JSON config file or a .env file
    #[arg(short, long, env = "BEACON_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Advertise until SIGINT/SIGTERM (default)
    Run {
        /// Drive the in-memory radio instead of hardware
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the advertising payload for the configured identity as hex
    Payload {
        /// Omit the leading flags record
        #[arg(long)]
        no_flags: bool,
    },
}

#[derive(Debug, Error)]
enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("invalid beacon settings: {0}")]
    Codec(#[from] CodecError),
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Codec(_) => 1,
            AppError::Radio(RadioError::InvalidParameters(_)) => 1,
            AppError::Radio(_) | AppError::Signal(_) => 2,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_env("BEACON_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { dry_run: false });

    let result = BeaconConfig::load(cli.config)
        .map_err(AppError::from)
        .and_then(|config| match command {
            Commands::Payload { no_flags } => print_payload(&config, !no_flags),
            Commands::Run { dry_run } => run(&config, dry_run),
        });

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn print_payload(config: &BeaconConfig, include_flags: bool) -> Result<(), AppError> {
    let identity = config.identity()?;
    println!("{}", hex::encode(payload::build(&identity, include_flags)));
    Ok(())
}

fn run(config: &BeaconConfig, dry_run: bool) -> Result<(), AppError> {
    let identity = config.identity()?;
    let params = config.advertising_parameters()?;
    let address = config.address_override(&mut rand::thread_rng())?;
    // Without a handler a signal would kill the process before `stop` runs.
    let shutdown = install_shutdown_flag()?;
    let radio = open_radio(config, dry_run)?;

    let mut controller = BeaconController::new(radio);
    controller.set_status_observer(|status| info!("beacon {status}"));
    controller.start(identity, params, address)?;
    info!(
        "advertising {identity}; polling every {:?}, send SIGINT to stop",
        config.poll_interval
    );

    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(config.poll_interval);
    }

    info!("stop requested");
    controller.stop()?;
    Ok(())
}

fn install_shutdown_flag() -> Result<Arc<AtomicBool>, AppError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        flag::register(signal, Arc::clone(&shutdown))?;
    }
    Ok(shutdown)
}

#[cfg(feature = "bluez")]
fn open_radio(config: &BeaconConfig, dry_run: bool) -> Result<Box<dyn RadioAdapter>, AppError> {
    if dry_run {
        info!("dry run: using the in-memory radio");
        return Ok(Box::new(InMemoryRadio::default()));
    }
    let radio = BluezRadio::open(BluezRadioConfig {
        adapter_name: config.adapter_name.clone(),
        call_timeout: config.radio_timeout,
    })?;
    Ok(Box::new(radio))
}

#[cfg(not(feature = "bluez"))]
fn open_radio(config: &BeaconConfig, dry_run: bool) -> Result<Box<dyn RadioAdapter>, AppError> {
    if !dry_run {
        warn!("built without the `bluez` feature; using the in-memory radio");
    }
    if let Some(name) = &config.adapter_name {
        warn!("adapter_name {name} ignored by the in-memory radio");
    }
    Ok(Box::new(InMemoryRadio::default()))
}
