//! Core data structures for the Pterodactyl client API
//!
//! These types mirror the JSON documents returned by the panel. Every field
//! that the panel may omit is an `Option` so that a missing upstream value
//! stays missing all the way to the snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Server
// ============================================================================

/// A server managed by the panel, as returned by the list endpoint
///
/// Fetched once at setup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Short identifier used in client API paths
    pub identifier: String,

    /// Display name
    pub name: String,

    /// Full UUID of the server
    #[serde(default)]
    pub uuid: Option<String>,

    /// Numeric id used by the application API
    #[serde(default)]
    pub internal_id: Option<u64>,

    /// Free-form description set in the panel
    #[serde(default)]
    pub description: Option<String>,

    /// Docker image the server runs in
    #[serde(default)]
    pub docker_image: Option<String>,

    /// Node the server is assigned to
    #[serde(default)]
    pub node: Option<String>,

    /// Whether the node is in maintenance mode
    #[serde(default)]
    pub is_node_under_maintenance: bool,
}

impl Server {
    /// Create a server with only the required fields set
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            uuid: None,
            internal_id: None,
            description: None,
            docker_image: None,
            node: None,
            is_node_under_maintenance: false,
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub count: u64,
    pub per_page: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

impl Pagination {
    /// Metadata for a response that fits on one page
    pub fn single(count: u64) -> Self {
        Self {
            total: count,
            count,
            per_page: count.max(1),
            current_page: 1,
            total_pages: 1,
        }
    }
}

/// One page of the server list
#[derive(Debug, Clone, PartialEq)]
pub struct ServerPage {
    pub servers: Vec<Server>,
    pub pagination: Pagination,
}

// ============================================================================
// Raw payloads
// ============================================================================

/// Payload of the utilization (`/resources`) endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilizationPayload {
    /// Process state: `running`, `starting`, `stopping` or `offline`
    #[serde(default)]
    pub current_state: Option<String>,

    #[serde(default)]
    pub is_suspended: Option<bool>,

    #[serde(default)]
    pub resources: Option<ResourceUsage>,
}

/// Resource counters reported by the node daemon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(default)]
    pub memory_bytes: Option<i64>,
    #[serde(default)]
    pub cpu_absolute: Option<f64>,
    #[serde(default)]
    pub disk_bytes: Option<i64>,
    #[serde(default)]
    pub network_tx_bytes: Option<i64>,
    #[serde(default)]
    pub network_rx_bytes: Option<i64>,
    /// Milliseconds since the process started
    #[serde(default)]
    pub uptime: Option<i64>,
}

/// Payload of the server info endpoint (only the fields we consume)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfoPayload {
    #[serde(default)]
    pub node: Option<String>,

    #[serde(default)]
    pub is_node_under_maintenance: Option<bool>,
}

/// Account details, used to validate credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

// ============================================================================
// Power actions
// ============================================================================

/// A power signal understood by the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
}

impl PowerAction {
    /// All accepted actions
    pub const ALL: [PowerAction; 3] = [Self::Start, Self::Stop, Self::Restart];

    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            other => Err(Error::validation(other)),
        }
    }
}
