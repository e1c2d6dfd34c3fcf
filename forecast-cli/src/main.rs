//! # forecast-sync
//!
//! CLI tool for exercising forecast sync.
//!
//! ## Commands
//!
//! - `publish`: Publish a forecast from the primary to the companion
//! - `request-sync`: Ask the primary for a fresh forecast
//! - `encode`: Write a forecast item to a file
//! - `decode`: Read a forecast item from a file
//!
//! `publish` and `request-sync` run both devices in-process over a loopback
//! transport pair.
//!
//! ## Example
//!
//! ```bash
//! # Publish and show what the companion received
//! forecast-sync publish --weather-id 800 --high 75° --low 52°
//!
//! # Round-trip through a file
//! forecast-sync encode --weather-id 800 --high 75° --low 52° --out forecast.bin
//! forecast-sync decode forecast.bin
//!
//! # Override paths, limits and log filter
//! forecast-sync --config forecast.toml publish --weather-id 500 --high 60° --low 48°
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{publish, record, request_sync};
use config::Config;

/// CLI tool for exercising forecast sync.
#[derive(Parser, Debug)]
#[command(name = "forecast-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Forecast fields shared by `publish` and `encode`.
#[derive(Args, Debug)]
struct ForecastArgs {
    /// Weather condition id
    #[arg(long, allow_hyphen_values = true)]
    weather_id: i32,

    /// Formatted high temperature
    #[arg(long, allow_hyphen_values = true)]
    high: String,

    /// Formatted low temperature
    #[arg(long, allow_hyphen_values = true)]
    low: String,

    /// Icon image file
    #[arg(long)]
    icon: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish a forecast and print what the companion received
    Publish {
        #[command(flatten)]
        forecast: ForecastArgs,
    },

    /// Send a sync request from the companion to the primary
    RequestSync,

    /// Encode a forecast item to a file
    Encode {
        #[command(flatten)]
        forecast: ForecastArgs,

        /// Publish timestamp in milliseconds (default: now)
        #[arg(long)]
        timestamp: Option<i64>,

        /// Output file
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Decode a forecast item from a file
    Decode {
        /// Input file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Publish { forecast } => {
            let icon = read_icon(forecast.icon.as_deref()).await?;
            publish::run(
                &config,
                forecast.weather_id,
                &forecast.high,
                &forecast.low,
                icon,
            )
            .await?;
        }
        Commands::RequestSync => {
            request_sync::run(&config).await?;
        }
        Commands::Encode {
            forecast,
            timestamp,
            out,
        } => {
            let icon = read_icon(forecast.icon.as_deref()).await?;
            record::encode(
                &config,
                record::Fields {
                    timestamp_millis: timestamp,
                    weather_id: forecast.weather_id,
                    high_temp: forecast.high,
                    low_temp: forecast.low,
                    icon,
                },
                &out,
            )
            .await?;
        }
        Commands::Decode { file } => {
            record::decode(&file).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_icon(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    use anyhow::Context;

    match path {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read icon {}", path.display()))?;
            Ok(Some(bytes))
        }
        None => Ok(None),
    }
}
