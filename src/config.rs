//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::publisher::PublisherConfig;
use crate::sampler::MarketConfig;
use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubSettings,

    #[serde(default)]
    pub publisher: PublisherSettings,

    #[serde(default)]
    pub market: MarketConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every path other than `/ws` and `/health`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> String {
    "./htmx".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Broadcast hub settings
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

fn default_buffer_capacity() -> usize {
    20
}

fn default_write_timeout() -> u64 {
    5
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

impl From<&HubSettings> for HubConfig {
    fn from(settings: &HubSettings) -> Self {
        HubConfig {
            buffer_capacity: settings.buffer_capacity,
            write_timeout: Duration::from_secs(settings.write_timeout_secs),
        }
    }
}

/// Publisher loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherSettings {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Per-sampler deadline; a sampler that misses it is published blank
    #[serde(default = "default_sample_timeout")]
    pub sample_timeout_secs: u64,
}

fn default_interval() -> u64 {
    5
}

fn default_sample_timeout() -> u64 {
    4
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            sample_timeout_secs: default_sample_timeout(),
        }
    }
}

impl From<&PublisherSettings> for PublisherConfig {
    fn from(settings: &PublisherSettings) -> Self {
        PublisherConfig {
            interval: Duration::from_secs(settings.interval_secs.max(1)),
            sample_timeout: Duration::from_secs(settings.sample_timeout_secs.max(1)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Files that exist but fail to load are skipped and returned in
    /// [`LoadedConfig::skipped`] so they can be logged once tracing is up.
    pub fn load_default() -> LoadedConfig {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("hostpulse").join("config.toml")),
            Some(PathBuf::from("/etc/hostpulse/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths, |key| std::env::var(key).ok())
    }

    fn load_first(paths: &[PathBuf], var: impl Fn(&str) -> Option<String>) -> LoadedConfig {
        let mut skipped = Vec::new();

        for path in paths.iter().filter(|path| path.exists()) {
            match Self::load(path) {
                Ok(mut config) => {
                    config.apply_overrides(&var);
                    return LoadedConfig {
                        config,
                        source: Some(path.clone()),
                        skipped,
                    };
                }
                Err(e) => skipped.push(e),
            }
        }

        // Fall back to environment-only config
        let mut config = Config::default();
        config.apply_overrides(&var);
        LoadedConfig {
            config,
            source: None,
            skipped,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("HOSTPULSE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("HOSTPULSE_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = var("HOSTPULSE_STATIC_DIR") {
            self.server.static_dir = dir;
        }

        // Publisher overrides
        if let Some(secs) = var("HOSTPULSE_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.publisher.interval_secs = secs;
        }
        if let Some(secs) = var("HOSTPULSE_SAMPLE_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.publisher.sample_timeout_secs = secs;
        }

        // Market overrides
        if let Some(url) = var("HOSTPULSE_MARKET_URL") {
            self.market.url = url;
        }

        // Logging overrides
        if let Some(level) = var("HOSTPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("HOSTPULSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Result of searching the default config locations
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config was read from, `None` for environment-only
    pub source: Option<PathBuf>,
    /// Files that exist but could not be loaded
    pub skipped: Vec<ConfigError>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Hostpulse Configuration
#
# Environment variables override these settings:
# - HOSTPULSE_HOST
# - HOSTPULSE_PORT
# - HOSTPULSE_STATIC_DIR
# - HOSTPULSE_INTERVAL_SECS
# - HOSTPULSE_SAMPLE_TIMEOUT_SECS
# - HOSTPULSE_MARKET_URL
# - HOSTPULSE_LOG_LEVEL
# - HOSTPULSE_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8000

# Directory with the dashboard page and assets
static_dir = "./htmx"

[hub]
# Updates buffered per viewer before new ones are dropped for that viewer
buffer_capacity = 20

# Deadline for delivering one update to a viewer (seconds)
write_timeout_secs = 5

[publisher]
# Sampling interval (seconds)
interval_secs = 5

# Longest one sampler may take before its sections are published blank (seconds)
sample_timeout_secs = 4

[market]
# Poll the weather/price aggregator
enabled = true

# Aggregator endpoint
url = "http://localhost:8080/api"

# Location for the weather report
location = "Kudelstaart"

# Request timeout (milliseconds)
request_timeout_ms = 3000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
