//! Unified error handling for the pterodactyl-panel crate
//!
//! Errors are layered the same way everywhere in the crate:
//!
//! - [`ApiError`] describes what went wrong on the wire (status code,
//!   transport failure, undecodable body)
//! - [`Error`] classifies it for the coordinator and setup code
//!
//! Only [`Error::AuthFailure`] is meant to escalate past a coordinator.
//! Everything else is absorbed and surfaces as stale or unavailable data.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pterodactyl_panel::error::{Error, PanelErrorTrait};
//!
//! fn handle(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!("will retry on next tick: {err}");
//!     } else {
//!         tracing::error!("needs attention: {err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::api::ApiError;

/// Result type for coordinator and setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common interface implemented by the crate's error types
pub trait PanelErrorTrait: std::error::Error {
    /// Check if the next scheduled attempt may succeed without intervention
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credentials rejected, needs re-authentication
    Auth,
    /// HTTP or transport failures
    Network,
    /// Invalid input rejected before any network call
    Validation,
    /// Configuration problems
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Config => "config",
        }
    }
}

/// Domain error for coordinator, setup and entity operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The panel rejected the API key (HTTP 401)
    #[error("Authentication rejected by panel: {reason}")]
    AuthFailure {
        server_id: Option<String>,
        reason: String,
    },

    /// Any other HTTP or network error while talking to a server
    #[error("Failed to communicate with server {server_id}: {source}")]
    TransientFailure {
        server_id: String,
        #[source]
        source: ApiError,
    },

    /// Invalid power action requested
    #[error("Invalid power action '{action}'. Valid options: start, stop, restart")]
    ValidationFailure { action: String },

    /// The panel could not be reached during setup
    #[error("Panel not ready: {source}")]
    NotReady {
        #[source]
        source: ApiError,
    },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error for an unknown power action
    pub fn validation(action: impl Into<String>) -> Self {
        Self::ValidationFailure {
            action: action.into(),
        }
    }

    /// Classify an API error raised while working on one server
    pub fn from_api(server_id: &str, source: ApiError) -> Self {
        if source.is_unauthorized() {
            Self::AuthFailure {
                server_id: Some(server_id.to_string()),
                reason: source.to_string(),
            }
        } else {
            Self::TransientFailure {
                server_id: server_id.to_string(),
                source,
            }
        }
    }

    /// Classify an API error raised during setup
    ///
    /// A rejected or unusable key is an auth failure, anything else means
    /// the panel is not ready yet.
    pub fn from_setup(source: ApiError) -> Self {
        if source.is_unauthorized() || matches!(source, ApiError::InvalidConfig(_)) {
            Self::AuthFailure {
                server_id: None,
                reason: source.to_string(),
            }
        } else {
            Self::NotReady { source }
        }
    }

    /// Check whether this is an authentication failure
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailure { .. })
    }
}

impl PanelErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::AuthFailure { .. } => false,
            Self::TransientFailure { .. } => true,
            Self::ValidationFailure { .. } => false,
            Self::NotReady { .. } => true,
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthFailure { .. } => ErrorCategory::Auth,
            Self::TransientFailure { .. } | Self::NotReady { .. } => ErrorCategory::Network,
            Self::ValidationFailure { .. } => ErrorCategory::Validation,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl PanelErrorTrait for ApiError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status != 401,
            Self::Network(_) => true,
            Self::Parse(_) => true,
            Self::InvalidConfig(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status: 401, .. } => ErrorCategory::Auth,
            Self::InvalidConfig(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}
