//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default polling period
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

/// Configuration shared by every server coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Polling period in seconds
    pub scan_interval_secs: u64,

    /// Refresh once when the poller starts instead of waiting a full period
    pub refresh_on_start: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            refresh_on_start: false,
        }
    }
}

impl CoordinatorConfig {
    /// Create a new config builder
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            return Err(Error::Config(
                "scan_interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Polling period as a Duration
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// Builder for CoordinatorConfig
#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    scan_interval_secs: Option<u64>,
    refresh_on_start: Option<bool>,
}

impl CoordinatorConfigBuilder {
    /// Set polling period
    pub fn scan_interval_secs(mut self, secs: u64) -> Self {
        self.scan_interval_secs = Some(secs);
        self
    }

    /// Refresh immediately when the poller starts
    pub fn refresh_on_start(mut self, enable: bool) -> Self {
        self.refresh_on_start = Some(enable);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<CoordinatorConfig> {
        let config = CoordinatorConfig {
            scan_interval_secs: self
                .scan_interval_secs
                .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS),
            refresh_on_start: self.refresh_on_start.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
