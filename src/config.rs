use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    pub backends: BackendsConfig,
    #[serde(default)]
    pub tail: TailConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Origins allowed to post analytics from browsers
    #[serde(default)]
    pub origins: Vec<String>,
}

/// Downstream Telegraf (metrics) and Loki (logs) endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendsConfig {
    pub telegraf_url: String,
    pub loki_url: String,
    /// Access service token, sent as `cf-access-client-id`
    #[serde(default)]
    pub client_id: String,
    /// Access service token secret, sent as `cf-access-client-secret`
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl BackendsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TailConfig {
    /// Service name the gateway reports its own translation failures under
    #[serde(default = "default_self_service")]
    pub self_service: String,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            self_service: default_self_service(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_self_service() -> String {
    "ingest-worker".to_string()
}

/// Load configuration from `path` (extension optional), overridden by
/// `INGEST_GATEWAY__SECTION__KEY` environment variables
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("INGEST_GATEWAY").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port must be non-zero");
    }

    if !matches!(cfg.server.log_format.as_str(), "text" | "json") {
        anyhow::bail!("Invalid log format '{}', expected 'text' or 'json'", cfg.server.log_format);
    }

    validate_backend_url("telegraf_url", &cfg.backends.telegraf_url)?;
    validate_backend_url("loki_url", &cfg.backends.loki_url)?;

    if cfg.backends.timeout_seconds == 0 {
        anyhow::bail!("Backend timeout must be at least one second");
    }

    if cfg.tail.self_service.is_empty() {
        anyhow::bail!("Tail self_service cannot be empty");
    }

    for origin in &cfg.analytics.origins {
        if origin.is_empty() {
            anyhow::bail!("Analytics origins cannot contain an empty origin");
        }
    }

    Ok(())
}

fn validate_backend_url(name: &str, value: &str) -> anyhow::Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("Backend {} '{}' is not a valid URL: {}", name, value, e))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => anyhow::bail!("Backend {} must use http or https, got '{}'", name, scheme),
    }
}
