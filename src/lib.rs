//! pterodactyl-panel - Pterodactyl game server panel adapter
//!
//! Polls a Pterodactyl panel's client API for every server visible to an API
//! key, keeps a normalized snapshot per server, and exposes sensors, binary
//! sensors, power buttons and a power switch on top of those snapshots.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`api`] - Panel client API trait and its HTTP implementation
//! - [`config`] - Configuration management and settings
//! - [`coordinator`] - Per-server polling, caching and power actions
//! - [`entities`] - Entity description tables and the entity adapter
//! - [`error`] - Error types and failure classification
//! - [`models`] - Core data structures and wire payloads
//! - [`setup`] - Integration setup, server discovery and re-authentication
//! - [`snapshot`] - Snapshot normalization
//!
//! # Example
//!
//! ```no_run
//! use pterodactyl_panel::config::Config;
//! use pterodactyl_panel::setup::Integration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let integration = Integration::connect(config.entry(), config.coordinator_config()).await?;
//!     for entity in integration.entities() {
//!         println!("{} = {:?}", entity.unique_id(), entity.state().value);
//!     }
//!     integration.unload().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod models;
pub mod setup;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{PanelApi, PanelClient};
    pub use crate::config::Config;
    pub use crate::coordinator::{CoordinatorConfig, CoordinatorState, ServerCoordinator};
    pub use crate::entities::{Entity, Platform};
    pub use crate::error::{Error, ErrorCategory, PanelErrorTrait, Result};
    pub use crate::models::{PowerAction, Server};
    pub use crate::setup::{ConfigEntry, Integration};
    pub use crate::snapshot::{MetricValue, Snapshot};
}

// Direct re-exports for convenience
pub use models::{PowerAction, Server};
pub use snapshot::Snapshot;
