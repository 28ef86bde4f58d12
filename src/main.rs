//! Hostpulse Server
//!
//! Run with: cargo run --bin hostpulse
//!
//! # Configuration
//!
//! Read from `--config`, or the first of
//! `~/.config/hostpulse/config.toml`, `/etc/hostpulse/config.toml` and
//! `./config.toml`. Environment variables override file values:
//! - `HOSTPULSE_HOST`, `HOSTPULSE_PORT`: Address to bind (default: 0.0.0.0:8000)
//! - `HOSTPULSE_STATIC_DIR`: Dashboard assets (default: ./htmx)
//! - `HOSTPULSE_INTERVAL_SECS`: Sampling interval (default: 5)
//! - `HOSTPULSE_SAMPLE_TIMEOUT_SECS`: Per-sampler deadline (default: 4)
//! - `HOSTPULSE_MARKET_URL`: Weather/price aggregator endpoint
//! - `HOSTPULSE_LOG_LEVEL`, `HOSTPULSE_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Overrides the log filter entirely

use anyhow::Context;
use clap::{Parser, Subcommand};
use hostpulse::api::{self, AppState};
use hostpulse::config::{generate_default_config, Config, LoadedConfig, LoggingConfig};
use hostpulse::publisher::{Publisher, PublisherConfig};
use hostpulse::sampler::default_samplers;
use hostpulse::websocket::{Hub, HubConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hostpulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live host monitoring dashboard over WebSocket")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard server (default)
    Serve,

    /// Print a default config file
    PrintConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hostpulse: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::PrintConfig) = cli.command {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let LoadedConfig {
        mut config,
        source,
        skipped,
    } = match &cli.config {
        Some(path) => LoadedConfig {
            config: Config::load_with_env(path)?,
            source: Some(path.clone()),
            skipped: Vec::new(),
        },
        None => Config::load_default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_logging(&config.logging);

    tracing::info!("Starting Hostpulse v{}", env!("CARGO_PKG_VERSION"));
    for e in &skipped {
        tracing::warn!("Skipped config file: {}", e);
    }
    match &source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }

    // Bind first so a busy port fails before anything starts
    let listener = api::bind(&config.server).await?;

    let hub = Arc::new(Hub::new(HubConfig::from(&config.hub)));
    let samplers =
        default_samplers(&config.market).context("Failed to initialize metric samplers")?;

    let shutdown = CancellationToken::new();
    let publisher = Publisher::new(
        Arc::clone(&hub),
        samplers,
        PublisherConfig::from(&config.publisher),
    );
    let publisher_task = publisher.spawn(shutdown.clone());

    tracing::info!(
        "Open the dashboard at http://localhost:{}",
        config.server.port
    );

    let state = AppState::new(hub, config.server.clone(), shutdown.clone());
    let result = api::serve(listener, state).await;

    shutdown.cancel();
    if let Err(e) = publisher_task.await {
        tracing::error!(error = %e, "Publisher task failed");
    }

    result?;
    tracing::info!("Hostpulse stopped");
    Ok(())
}

/// Install the global tracing subscriber
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("hostpulse={},tower_http=info", config.level))
    });
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
