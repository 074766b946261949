//! Configuration management
//!
//! Configuration is loaded from environment variables or a TOML file:
//!
//! ```toml
//! [panel]
//! host = "https://panel.example.com"
//! api_key = "ptlc_..."
//! request_timeout_secs = 10
//!
//! [polling]
//! scan_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::ClientConfig;
use crate::coordinator::config::DEFAULT_SCAN_INTERVAL_SECS;
use crate::coordinator::CoordinatorConfig;
use crate::setup::ConfigEntry;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Panel connection
    pub panel: PanelConfig,

    /// Polling behaviour
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Panel connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Panel base URL
    pub host: String,

    /// Client API key
    pub api_key: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Keep the key out of logs
impl std::fmt::Debug for PanelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between refreshes of one server
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_scan_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

// Unset falls back silently; set but unparsable falls back with a warning
fn env_u64(name: &str, default: u64) -> u64 {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                var = name,
                value = %raw,
                error = %e,
                default = default,
                "Ignoring malformed environment variable"
            );
            default
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("PTERODACTYL_HOST").context("PTERODACTYL_HOST is not set")?;
        let api_key =
            std::env::var("PTERODACTYL_API_KEY").context("PTERODACTYL_API_KEY is not set")?;

        let request_timeout_secs = env_u64(
            "PTERODACTYL_REQUEST_TIMEOUT_SECS",
            default_request_timeout_secs(),
        );
        let scan_interval_secs =
            env_u64("PTERODACTYL_SCAN_INTERVAL_SECS", DEFAULT_SCAN_INTERVAL_SECS);

        let level =
            std::env::var("PTERODACTYL_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format =
            std::env::var("PTERODACTYL_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            panel: PanelConfig {
                host,
                api_key,
                request_timeout_secs,
            },
            polling: PollingConfig { scan_interval_secs },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.panel.host)
            .with_context(|| format!("host is not a valid URL: {}", self.panel.host))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("host must use http or https, got {}", url.scheme());
        }

        if self.panel.api_key.trim().is_empty() {
            anyhow::bail!("api_key must not be empty");
        }

        if self.panel.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.polling.scan_interval_secs == 0 {
            anyhow::bail!("scan_interval_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be text or json, got {}", self.logging.format);
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.panel.request_timeout_secs)
    }

    /// Settings for the HTTP client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.panel.host, &self.panel.api_key).with_timeout(self.request_timeout())
    }

    /// Settings shared by every coordinator
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            scan_interval_secs: self.polling.scan_interval_secs,
            ..CoordinatorConfig::default()
        }
    }

    /// Connection entry for [`Integration`](crate::setup::Integration)
    pub fn entry(&self) -> ConfigEntry {
        ConfigEntry::new(&self.panel.host, &self.panel.api_key)
            .with_request_timeout(self.request_timeout())
    }
}
