//! Hostname blacklister process.
//!
//! # Architecture Overview
//!
//! ```text
//!   stdin (timeout reports)
//!        │
//!        ▼
//!   ┌─────────┐  "timeout-url"  ┌──────────────┐
//!   │ ingest  │────────────────▶│  event bus   │── redelivery w/ backoff
//!   └─────────┘                 └──────┬───────┘
//!                                      ▼
//!                              ┌──────────────┐     ┌──────────────┐
//!                              │ blacklister  │────▶│   prober     │──▶ origin
//!                              │   engine     │     └──────────────┘
//!                              └──┬────────┬──┘
//!                                 │        │
//!                                 ▼        ▼
//!                       ┌────────────┐  ┌──────────────────────┐
//!                       │  counter   │  │ config service (HTTP) │
//!                       │   cache    │  │ GET|PUT /config/{key} │
//!                       └────────────┘  └──────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use hostname_blacklister::config::{load_config, BlacklisterConfig};
use hostname_blacklister::lifecycle::{signals, startup};
use hostname_blacklister::observability::{logging, metrics};
use hostname_blacklister::Shutdown;

#[derive(Parser)]
#[command(name = "blacklister")]
#[command(about = "Blacklists hostnames that keep timing out", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the config service and the blacklister, reading reports from stdin
    Serve,
    /// Validate the configuration and print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BlacklisterConfig::default(),
    };

    match cli.command {
        Commands::CheckConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: BlacklisterConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "blacklister starting");
    tracing::info!(
        config_api = %config.config_api.bind_address,
        topic = %config.events.topic,
        queue = %config.events.queue,
        probe_timeout_secs = config.prober.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(signals::wait_for_signal(shutdown.clone()));

    let input = BufReader::new(tokio::io::stdin());
    startup::run(config, input, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
