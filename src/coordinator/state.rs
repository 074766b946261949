//! Coordinator lifecycle state and the data readers observe
//!
//! ```text
//! Uninitialized ──ok──▶ Ready ◀──ok── Stale
//!       │                 │  ╲          ▲
//!       │                 │   ╲─fail────╯
//!       └──────401────────┴──401──▶ AuthFailed (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::snapshot::Snapshot;

/// Lifecycle state of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No refresh has succeeded yet
    Uninitialized,

    /// Last refresh succeeded
    Ready,

    /// Last refresh failed, previous snapshot retained
    Stale,

    /// Credentials rejected; terminal until re-authentication
    AuthFailed,
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Stale => "stale",
            Self::AuthFailed => "auth_failed",
        }
    }

    /// State after a failed, non-auth refresh
    pub(crate) fn after_transient_failure(self) -> Self {
        match self {
            Self::Ready | Self::Stale => Self::Stale,
            other => other,
        }
    }
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// Everything a reader can see about one coordinator
///
/// Always replaced as a whole, so readers never observe a mix of old and
/// new fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorData {
    pub state: CoordinatorState,

    /// Last fully successful snapshot, if any
    pub snapshot: Option<Arc<Snapshot>>,

    /// Whether the most recent refresh succeeded
    pub last_update_success: bool,

    /// When the snapshot was last replaced
    pub last_updated: Option<DateTime<Utc>>,

    /// Message of the most recent failure
    pub last_error: Option<String>,
}

impl CoordinatorData {
    /// Data is trustworthy and current
    pub fn is_available(&self) -> bool {
        self.last_update_success && self.state == CoordinatorState::Ready
    }
}
