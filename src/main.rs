use anyhow::{Context, Result};
use clap::Parser;
use outreach_insights::cli::{handle_command, Cli};
use std::fs::OpenOptions;
use tracing::{error, info};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "/tmp/outreach-insights.log";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging first
    let log_path =
        std::env::var("OUTREACH_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true) // Clear file on startup
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let run_id = uuid::Uuid::new_v4().to_string();
    info!("Starting outreach-insights run {}", run_id);

    let result = handle_command(cli, &run_id).await;
    if let Err(e) = &result {
        error!("Run {} failed: {:#}", run_id, e);
    }
    result
}
