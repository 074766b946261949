//! Integration setup, unload and re-authentication
//!
//! An [`Integration`] is the explicit context object for one configured
//! panel: it owns the shared API handle, one coordinator per server, their
//! pollers, and the channel on which auth failures are reported.
//!
//! # Lifecycle
//!
//! ```text
//! setup:  validate key ─▶ list servers (all pages) ─▶ coordinator per server
//!                         ─▶ initial refresh each ─▶ start pollers
//! unload: stop pollers (in-flight refreshes may finish)
//! reload: unload ─▶ setup
//! ```

pub mod discovery;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::{ClientConfig, PanelApi, PanelClient};
use crate::coordinator::{CoordinatorConfig, Poller, ReauthRequest, ServerCoordinator};
use crate::entities::{self, Entity};
use crate::error::{Error, Result};

pub use discovery::{collect_servers, validate_credentials};

/// Integration domain name
pub const DOMAIN: &str = "pterodactyl_panel";

// ============================================================================
// Config entry
// ============================================================================

/// Stored connection settings for one panel
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Unique id of this entry, used to build entity ids
    pub entry_id: String,

    /// Panel base URL
    pub host: String,

    /// Client API key
    pub api_key: String,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl ConfigEntry {
    /// Create an entry; the host doubles as the entry id
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            entry_id: host.clone(),
            host,
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_entry_id(mut self, entry_id: impl Into<String>) -> Self {
        self.entry_id = entry_id.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Settings for the HTTP client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.host, &self.api_key).with_timeout(self.request_timeout)
    }
}

impl std::fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("entry_id", &self.entry_id)
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

// ============================================================================
// Integration
// ============================================================================

/// A running integration for one panel
pub struct Integration {
    entry: ConfigEntry,
    api: Arc<dyn PanelApi>,
    settings: CoordinatorConfig,
    coordinators: Vec<Arc<ServerCoordinator>>,
    pollers: Vec<Poller>,
    reauth_rx: Option<mpsc::UnboundedReceiver<ReauthRequest>>,
}

impl Integration {
    /// Build an HTTP client for `entry` and set up
    pub async fn connect(entry: ConfigEntry, settings: CoordinatorConfig) -> Result<Self> {
        let client = PanelClient::new(entry.client_config()).map_err(Error::from_setup)?;
        Self::setup(entry, Arc::new(client), settings).await
    }

    /// Set up the integration against `api`
    ///
    /// # Errors
    ///
    /// - `AuthFailure` if the key is rejected at any point of setup
    /// - `NotReady` if the panel cannot be reached
    /// - `Config` if `settings` are invalid
    pub async fn setup(
        entry: ConfigEntry,
        api: Arc<dyn PanelApi>,
        settings: CoordinatorConfig,
    ) -> Result<Self> {
        settings.validate()?;
        info!(domain = DOMAIN, host = %entry.host, "Starting setup");

        validate_credentials(api.as_ref()).await?;
        let servers = collect_servers(api.as_ref()).await?;

        let (reauth_tx, reauth_rx) = mpsc::unbounded_channel();
        let mut coordinators = Vec::with_capacity(servers.len());

        for server in servers {
            let coordinator = Arc::new(
                ServerCoordinator::new(server, Arc::clone(&api), settings.clone())
                    .with_reauth_sender(reauth_tx.clone()),
            );

            match coordinator.refresh().await {
                Ok(_) => {}
                Err(err) if err.is_auth_failure() => return Err(err),
                Err(err) => {
                    warn!(
                        server_id = %coordinator.server_id(),
                        error = %err,
                        "Initial refresh failed, server starts unavailable"
                    );
                }
            }

            coordinators.push(coordinator);
        }

        let pollers = coordinators.iter().map(|c| c.start()).collect();

        info!(
            host = %entry.host,
            servers = coordinators.len(),
            interval_secs = settings.scan_interval_secs,
            "Setup complete"
        );

        Ok(Self {
            entry,
            api,
            settings,
            coordinators,
            pollers,
            reauth_rx: Some(reauth_rx),
        })
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub fn settings(&self) -> &CoordinatorConfig {
        &self.settings
    }

    pub fn coordinators(&self) -> &[Arc<ServerCoordinator>] {
        &self.coordinators
    }

    /// Coordinator for a server identifier
    pub fn coordinator(&self, server_id: &str) -> Option<&Arc<ServerCoordinator>> {
        self.coordinators
            .iter()
            .find(|c| c.server_id() == server_id)
    }

    /// Entities for every coordinator, built from the description tables
    pub fn entities(&self) -> Vec<Entity> {
        self.coordinators
            .iter()
            .flat_map(|c| entities::build_entities(&self.entry, c))
            .collect()
    }

    /// Receiver for re-authentication requests; can be taken once
    pub fn take_reauth_requests(&mut self) -> Option<mpsc::UnboundedReceiver<ReauthRequest>> {
        self.reauth_rx.take()
    }

    /// Stop all pollers
    pub async fn unload(self) {
        let count = self.pollers.len();
        futures::future::join_all(self.pollers.into_iter().map(Poller::stop)).await;
        info!(host = %self.entry.host, pollers = count, "Unloaded");
    }

    /// Unload and set up again with the same entry
    pub async fn reload(self) -> Result<Self> {
        let entry = self.entry.clone();
        let api = Arc::clone(&self.api);
        let settings = self.settings.clone();

        self.unload().await;
        Self::setup(entry, api, settings).await
    }

    /// Replace the API key and reload
    ///
    /// The new key is checked against the same host first. If it is
    /// rejected the integration is unloaded and `AuthFailure` returned.
    pub async fn reauthenticate(self, api_key: impl Into<String>) -> Result<Self> {
        let entry = self.entry.clone().with_api_key(api_key);
        let settings = self.settings.clone();

        let api: Arc<dyn PanelApi> = match PanelClient::new(entry.client_config()) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                self.unload().await;
                return Err(Error::from_setup(e));
            }
        };

        if let Err(err) = validate_credentials(api.as_ref()).await {
            warn!(host = %entry.host, error = %err, "New credentials rejected");
            self.unload().await;
            return Err(err);
        }

        self.unload().await;
        Self::setup(entry, api, settings).await
    }
}

impl std::fmt::Debug for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration")
            .field("entry", &self.entry)
            .field("coordinators", &self.coordinators)
            .finish()
    }
}
