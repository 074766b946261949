//! Remote API seam for the Pterodactyl panel
//!
//! The coordinator and setup code only ever talk to the panel through the
//! [`PanelApi`] trait. [`PanelClient`] is the HTTP implementation; tests
//! substitute in-memory fakes.
//!
//! # Endpoints
//!
//! ```text
//! GET  /api/client/account
//! GET  /api/client?page={n}
//! GET  /api/client/servers/{id}
//! GET  /api/client/servers/{id}/resources
//! POST /api/client/servers/{id}/power   {"signal": "start"}
//! ```

pub mod client;

use async_trait::async_trait;

use crate::models::{Account, PowerAction, ServerInfoPayload, ServerPage, UtilizationPayload};

pub use client::{ClientConfig, PanelClient};

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised by a single API call
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The panel answered with a non-success status
    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// The client could not be built from its configuration
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status of the failure, if the panel answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check whether the panel rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Capabilities the panel exposes to this crate
///
/// Implementations must be stateless per call: the same handle is shared by
/// every coordinator without locking.
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// Fetch the account owning the API key
    async fn get_account(&self) -> ApiResult<Account>;

    /// Fetch one page (1-based) of the servers visible to the key
    async fn list_servers(&self, page: u32) -> ApiResult<ServerPage>;

    /// Fetch live resource utilization for a server
    async fn get_server_utilization(&self, server_id: &str) -> ApiResult<UtilizationPayload>;

    /// Fetch server details
    async fn get_server_info(&self, server_id: &str) -> ApiResult<ServerInfoPayload>;

    /// Send a power signal to a server
    async fn send_power_action(&self, server_id: &str, action: PowerAction) -> ApiResult<()>;
}
