use anyhow::{Context, Result};
use clap::Parser;
use cv_builder::cli::{handle_cli, Cli};
use cv_builder::core::ConfigManager;
use std::fs::OpenOptions;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigManager::load()?;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true) // Clear file on startup
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .init();

    info!(
        "Starting cvbuild, configuration loaded for environment: {}",
        ConfigManager::get_environment()
    );
    info!("API: {}", config.api_url);
    info!("Data: {}", config.data_dir.display());
    info!("Output: {}", config.output_dir.display());

    handle_cli(cli, config).await
}
