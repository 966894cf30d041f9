use anyhow::Result;
use colored::Colorize;
use ingest_gateway::{config, logging::sanitize_config};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(config_path)?;
    let sanitized = sanitize_config(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration file");

    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Analytics Origins: {}", cfg.analytics.origins.len());
    println!("  Backends: {}", count_backends(&cfg));

    info!("Configuration validation successful");
    Ok(())
}

/// Count distinct backend endpoints, Telegraf and Loki may share one
fn count_backends(cfg: &config::Config) -> usize {
    if cfg.backends.telegraf_url == cfg.backends.loki_url {
        1
    } else {
        2
    }
}
