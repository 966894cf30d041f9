use anyhow::Result;
use colored::Colorize;
use ingest_gateway::{config, init_tracing, server};
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads configuration, initializes tracing from it, then serves until a
/// shutdown signal arrives.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting ingest gateway...".green());

    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, cfg.server.log_format == "json");

    info!(config = %config_path.display(), "Configuration loaded");

    server::start_server(cfg, config_path.to_path_buf()).await?;

    Ok(())
}
