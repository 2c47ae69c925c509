//! SignalEngine - Main Entry Point
//!
//! Reads raw alerts (one per line) from a file or stdin, turns them into
//! directives and keeps the registry of active directives until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signal_engine::common::channels::{create_alert_channel_with_size, AlertSender};
use signal_engine::config::load_config;
use signal_engine::gateway::{providers_from_config, resolve_credentials, OpenAiGateway};
use signal_engine::StrategyManager;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SIGNAL_ENGINE_LOG")]
    log_level: Option<String>,

    /// File with one alert per line; reads stdin when omitted
    #[arg(long)]
    alerts_file: Option<String>,
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Forward alert lines into the ingestion queue until input ends
async fn feed_alerts<R>(reader: R, sender: AlertSender)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                if sender.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read alert input: {}", e);
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config))?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_tracing(&level, &config.settings.log_format)?;

    info!("Starting SignalEngine");
    info!("Configuration file: {}", args.config);

    let credentials = resolve_credentials(&providers_from_config(&config.llm))?;
    let gateway = OpenAiGateway::new(&config.llm, credentials)?;
    info!("Language-model endpoint: {}", gateway.endpoint());

    let mut manager = StrategyManager::new(Arc::new(gateway), config.llm.request_timeout());
    let (sender, receiver) = create_alert_channel_with_size(config.ingestion.channel_size);
    manager.start(receiver)?;

    let feeder = match &args.alerts_file {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            tokio::spawn(feed_alerts(file, sender))
        }
        None => tokio::spawn(feed_alerts(tokio::io::stdin(), sender)),
    };

    info!("Application initialized successfully");

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");

    feeder.abort();
    if let Some(stats) = manager.stop().await? {
        info!(
            received = stats.received,
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Ingestion summary"
        );
    }

    let registry = manager.registry();
    for entry in registry.list_active().await {
        info!(
            id = %entry.directive.id,
            symbol = %entry.directive.symbol,
            side = %entry.directive.side,
            accepted_at = %entry.accepted_at,
            "Active directive"
        );
    }

    Ok(())
}
