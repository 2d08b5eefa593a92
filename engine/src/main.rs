// Course catalog assistant
// Main entry point for the catalog binary

use anyhow::Context;
use clap::Parser;
use catalog_engine::cli::{Cli, Command};
use catalog_engine::config::Config;
use catalog_engine::handlers::{
    handle_chat, handle_doctor, handle_history, handle_ingest, OutputFormat,
};
use catalog_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)
    } else {
        Config::load_or_create()
    }
    .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // --log wins over the config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Catalog v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Chat => {
            tracing::info!("Starting chat session...");
            handle_chat(&config, format).await
        }

        Command::Ingest { csv, reset } => {
            tracing::info!("Ingesting schedule (reset: {})", reset);
            handle_ingest(&config, csv, reset, format).await
        }

        Command::History { limit } => {
            tracing::info!("Showing last {} sessions", limit);
            handle_history(limit, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, &config_path, format).await
        }
    }
}
