//! roomwatch CLI
//!
//! Runs a single availability check, or keeps polling until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use roomwatch::{
    error::Result,
    models::{Config, NotifyConfig},
    pipeline::{self, Monitor, Schedule},
};

/// roomwatch - Hotel Room Availability Monitor
#[derive(Parser, Debug)]
#[command(
    name = "roomwatch",
    version,
    about = "Watches hotel reservation backends for room availability changes"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "roomwatch.toml")]
    config: PathBuf,

    /// Run one check and exit, or keep polling
    #[arg(short, long, value_enum, default_value_t = Mode::Single)]
    mode: Mode,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Single,
    Monitor,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("roomwatch starting...");

    let config = Config::load_or_default(&cli.config);
    log::info!("Loaded configuration from {}", cli.config.display());

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let notify = NotifyConfig::from_env();
    let channels = notify.enabled_channels();

    if cli.validate {
        log::info!("✓ Config OK ({} backends)", config.backends.len());
        for backend in &config.backends {
            log::info!("  {} [{}] {}", backend.name(), backend.kind(), backend.endpoint());
        }
        if channels.is_empty() {
            log::warn!("No notification channels configured");
        } else {
            log::info!("Notification channels: {}", channels.join(", "));
        }
        return Ok(());
    }

    let monitor = Monitor::from_config(&config, &notify)?;
    log::info!(
        "Target dates: {}",
        config
            .all_target_dates()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    match cli.mode {
        Mode::Single => {
            let report = monitor.run_check().await;
            let summary = report.summary();
            log::info!(
                "Summary: {} available, {} sold out, {} changes, {} failed backends",
                summary.available,
                summary.sold_out,
                summary.changes,
                summary.failed_backends
            );
        }
        Mode::Monitor => {
            let schedule = Schedule::new(
                Duration::from_secs(config.monitor.check_interval_secs),
                Duration::from_secs(config.monitor.error_backoff_secs),
            );
            pipeline::run_monitor(&monitor, schedule).await;
        }
    }

    log::info!("Done!");

    Ok(())
}
