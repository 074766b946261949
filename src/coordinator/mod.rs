//! Per-server polling coordinators
//!
//! Each managed server gets one [`ServerCoordinator`]. It polls the panel on
//! a fixed period, keeps the last good [`Snapshot`](crate::snapshot::Snapshot),
//! fans out change notifications, and dispatches power actions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            ServerCoordinator             │
//! │                                          │
//! │  timer ──tick──▶ try_lock(refresh) ──┐   │
//! │                   (busy: skip)       │   │
//! │                                      ▼   │
//! │   utilization ─┐                         │
//! │   info ────────┴─▶ normalize ─▶ swap ────┼──▶ listeners
//! │                                          │
//! │   send_power_action ─▶ queue ─▶ panel    │
//! └──────────────────────────────────────────┘
//!            │ 401
//!            ▼
//!      ReauthRequest ──▶ Integration
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pterodactyl_panel::coordinator::{CoordinatorConfig, ServerCoordinator};
//!
//! let coordinator = Arc::new(ServerCoordinator::new(server, api, CoordinatorConfig::default()));
//! coordinator.refresh().await?;
//! let poller = coordinator.start();
//! // ...
//! poller.stop().await;
//! ```

pub mod config;
pub mod listeners;
pub mod server;
pub mod state;

// Re-export main types
pub use config::CoordinatorConfig;
pub use listeners::{ListenerSet, Subscription};
pub use server::{CoordinatorStats, Poller, ReauthRequest, ServerCoordinator};
pub use state::{CoordinatorData, CoordinatorState};
