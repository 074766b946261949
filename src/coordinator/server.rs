//! Per-server update coordinator
//!
//! A [`ServerCoordinator`] owns one server's snapshot, refreshes it from the
//! panel, and dispatches power actions. [`ServerCoordinator::start`] spawns
//! the polling task and returns a [`Poller`] handle used to stop it.
//!
//! Refreshes are single-flight: a timer tick that finds a refresh still in
//! progress is skipped, never queued. Power actions are serialized among
//! themselves but never wait for, nor trigger, a refresh.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::CoordinatorConfig;
use super::listeners::{ListenerSet, Subscription};
use super::state::{CoordinatorData, CoordinatorState};
use crate::api::PanelApi;
use crate::error::{Error, Result};
use crate::models::{PowerAction, Server};
use crate::snapshot::{normalize, Snapshot};

// ============================================================================
// Escalation and statistics
// ============================================================================

/// Request for new credentials, sent when the panel answers 401
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReauthRequest {
    pub server_id: String,
    pub reason: String,
}

/// Counters describing a coordinator's activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Successful refreshes
    pub refreshes: u64,
    /// Failed refreshes
    pub failures: u64,
    /// Timer ticks skipped because a refresh was in flight or auth failed
    pub skipped_ticks: u64,
    /// Power actions sent to the panel
    pub power_actions: u64,
}

#[derive(Default)]
struct Counters {
    refreshes: AtomicU64,
    failures: AtomicU64,
    skipped_ticks: AtomicU64,
    power_actions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            power_actions: self.power_actions.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Server Coordinator
// ============================================================================

/// Polling, caching and action dispatch for one server
pub struct ServerCoordinator {
    server: Server,
    api: Arc<dyn PanelApi>,
    config: CoordinatorConfig,
    data: RwLock<Arc<CoordinatorData>>,
    refresh_lock: Arc<Mutex<()>>,
    action_lock: Mutex<()>,
    listeners: ListenerSet,
    reauth_tx: Option<mpsc::UnboundedSender<ReauthRequest>>,
    counters: Counters,
}

impl ServerCoordinator {
    /// Create a coordinator for `server`
    pub fn new(server: Server, api: Arc<dyn PanelApi>, config: CoordinatorConfig) -> Self {
        Self {
            server,
            api,
            config,
            data: RwLock::new(Arc::new(CoordinatorData::default())),
            refresh_lock: Arc::new(Mutex::new(())),
            action_lock: Mutex::new(()),
            listeners: ListenerSet::new(),
            reauth_tx: None,
            counters: Counters::default(),
        }
    }

    /// Forward auth failures to `tx`
    pub fn with_reauth_sender(mut self, tx: mpsc::UnboundedSender<ReauthRequest>) -> Self {
        self.reauth_tx = Some(tx);
        self
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn server_id(&self) -> &str {
        &self.server.identifier
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Current data, as one consistent value
    pub fn data(&self) -> Arc<CoordinatorData> {
        let guard = self.data.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&*guard)
    }

    /// Last successful snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.data().snapshot.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.data().state
    }

    pub fn last_update_success(&self) -> bool {
        self.data().last_update_success
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.counters.snapshot()
    }

    /// Whether a refresh is currently running
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    /// Get notified after every refresh outcome
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CoordinatorData) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Refresh now, waiting for an in-flight refresh to finish first
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh now unless a refresh is already running
    ///
    /// Returns `None` when the request was skipped.
    pub async fn request_refresh(&self) -> Option<Result<Arc<Snapshot>>> {
        let _guard = self.refresh_lock.try_lock().ok()?;
        Some(self.refresh_locked().await)
    }

    // Must be called with refresh_lock held
    async fn refresh_locked(&self) -> Result<Arc<Snapshot>> {
        if self.state() == CoordinatorState::AuthFailed {
            return Err(self.reauth_required());
        }

        match self.fetch().await {
            Ok(snapshot) => self.commit(snapshot),
            Err(err) => {
                Counters::bump(&self.counters.failures);
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    // Calls are sequential: utilization first, then info
    async fn fetch(&self) -> Result<Snapshot> {
        let server_id = self.server_id();

        let utilization = self
            .api
            .get_server_utilization(server_id)
            .await
            .map_err(|e| Error::from_api(server_id, e))?;

        let info = self
            .api
            .get_server_info(server_id)
            .await
            .map_err(|e| Error::from_api(server_id, e))?;

        Ok(normalize(&utilization, &info))
    }

    fn commit(&self, snapshot: Snapshot) -> Result<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);

        let swapped = self.try_update(|current| {
            // A concurrent power action may have hit a 401 meanwhile
            if current.state == CoordinatorState::AuthFailed {
                return None;
            }
            Some(CoordinatorData {
                state: CoordinatorState::Ready,
                snapshot: Some(Arc::clone(&snapshot)),
                last_update_success: true,
                last_updated: Some(chrono::Utc::now()),
                last_error: None,
            })
        });

        let Some((previous, data)) = swapped else {
            debug!(
                server_id = %self.server_id(),
                "Discarding refresh, credentials were rejected meanwhile"
            );
            return Err(self.reauth_required());
        };
        Counters::bump(&self.counters.refreshes);

        if previous.state == CoordinatorState::Stale {
            info!(server_id = %self.server_id(), "Fetching server data recovered");
        } else {
            debug!(
                server_id = %self.server_id(),
                metrics = snapshot.len(),
                "Server data refreshed"
            );
        }

        self.listeners.notify(&data);
        Ok(snapshot)
    }

    fn record_failure(&self, err: &Error) {
        if err.is_auth_failure() {
            self.mark_auth_failed(err);
            return;
        }

        let (previous, data) = self.update(|current| CoordinatorData {
            state: current.state.after_transient_failure(),
            snapshot: current.snapshot.clone(),
            last_update_success: false,
            last_updated: current.last_updated,
            last_error: Some(err.to_string()),
        });

        // Log once per outage, not on every tick
        if previous.last_error.is_none() {
            warn!(server_id = %self.server_id(), error = %err, "Error fetching server data");
        } else {
            debug!(server_id = %self.server_id(), error = %err, "Server still unreachable");
        }

        self.listeners.notify(&data);
    }

    fn mark_auth_failed(&self, err: &Error) {
        let (previous, data) = self.update(|current| CoordinatorData {
            state: CoordinatorState::AuthFailed,
            snapshot: current.snapshot.clone(),
            last_update_success: false,
            last_updated: current.last_updated,
            last_error: Some(err.to_string()),
        });

        if previous.state != CoordinatorState::AuthFailed {
            error!(
                server_id = %self.server_id(),
                error = %err,
                "Panel rejected credentials, requesting re-authentication"
            );

            if let Some(tx) = &self.reauth_tx {
                let request = ReauthRequest {
                    server_id: self.server_id().to_string(),
                    reason: err.to_string(),
                };
                if tx.send(request).is_err() {
                    debug!(server_id = %self.server_id(), "Re-auth receiver dropped");
                }
            }
        }

        self.listeners.notify(&data);
    }

    // Replace the data under the write lock; returns (previous, new)
    fn update<F>(&self, next: F) -> (Arc<CoordinatorData>, Arc<CoordinatorData>)
    where
        F: FnOnce(&CoordinatorData) -> CoordinatorData,
    {
        let mut guard = self.data.write().unwrap_or_else(|p| p.into_inner());
        let new = Arc::new(next(guard.as_ref()));
        let previous = std::mem::replace(&mut *guard, Arc::clone(&new));
        (previous, new)
    }

    // Like update, but leaves the data alone when `next` returns None
    fn try_update<F>(&self, next: F) -> Option<(Arc<CoordinatorData>, Arc<CoordinatorData>)>
    where
        F: FnOnce(&CoordinatorData) -> Option<CoordinatorData>,
    {
        let mut guard = self.data.write().unwrap_or_else(|p| p.into_inner());
        let new = Arc::new(next(guard.as_ref())?);
        let previous = std::mem::replace(&mut *guard, Arc::clone(&new));
        Some((previous, new))
    }

    fn reauth_required(&self) -> Error {
        Error::AuthFailure {
            server_id: Some(self.server_id().to_string()),
            reason: "credentials were rejected, re-authentication required".to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Power actions
    // ------------------------------------------------------------------------

    /// Send a power action to this server
    ///
    /// Actions on one coordinator are queued and sent one at a time. The next
    /// scheduled refresh observes the resulting state.
    pub async fn send_power_action(&self, action: PowerAction) -> Result<()> {
        let _queue = self.action_lock.lock().await;
        let server_id = self.server_id();

        if self.state() == CoordinatorState::AuthFailed {
            return Err(self.reauth_required());
        }

        info!(server_id = %server_id, action = %action, "Sending power action");
        Counters::bump(&self.counters.power_actions);

        match self.api.send_power_action(server_id, action).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = Error::from_api(server_id, e);
                if err.is_auth_failure() {
                    self.mark_auth_failed(&err);
                } else {
                    warn!(server_id = %server_id, action = %action, error = %err, "Power action failed");
                }
                Err(err)
            }
        }
    }

    /// Parse `action` and send it
    ///
    /// Anything other than `start`, `stop` or `restart` fails with
    /// [`Error::ValidationFailure`] before any network call.
    pub async fn send_power_action_str(&self, action: &str) -> Result<()> {
        let action: PowerAction = action.parse()?;
        self.send_power_action(action).await
    }

    // ------------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------------

    /// Spawn the polling task
    pub fn start(self: &Arc<Self>) -> Poller {
        let period = self.config.scan_interval();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let coordinator = Arc::clone(self);

        let task = tokio::spawn(async move {
            let first = if coordinator.config.refresh_on_start {
                Instant::now()
            } else {
                Instant::now() + period
            };
            let mut ticker = tokio::time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            debug!(
                server_id = %coordinator.server_id(),
                interval_secs = period.as_secs(),
                "Poller started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => coordinator.on_tick(),
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!(server_id = %coordinator.server_id(), "Poller stopped");
        });

        Poller {
            server_id: self.server_id().to_string(),
            stop_tx,
            task,
        }
    }

    fn on_tick(self: &Arc<Self>) {
        if self.state() == CoordinatorState::AuthFailed {
            Counters::bump(&self.counters.skipped_ticks);
            debug!(server_id = %self.server_id(), "Skipping tick, waiting for re-authentication");
            return;
        }

        let guard = match Arc::clone(&self.refresh_lock).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                Counters::bump(&self.counters.skipped_ticks);
                debug!(server_id = %self.server_id(), "Refresh still in flight, skipping tick");
                return;
            }
        };

        // Run the refresh off the timer task so the next tick can observe it
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            // Outcome is already recorded and logged by refresh_locked
            let _ = coordinator.refresh_locked().await;
        });
    }
}

impl std::fmt::Debug for ServerCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCoordinator")
            .field("server_id", &self.server.identifier)
            .field("name", &self.server.name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Poller handle
// ============================================================================

/// Handle to a running polling task
pub struct Poller {
    server_id: String,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Poller {
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the timer and wait for the polling task to exit
    ///
    /// A refresh already in flight is left to finish on its own; it commits
    /// atomically or not at all.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(server_id = %self.server_id, "Poller task panicked");
            }
        }
    }
}
