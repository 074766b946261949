//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pterodactyl_panel::api::{ApiError, ApiResult, PanelApi};
use pterodactyl_panel::coordinator::{CoordinatorConfig, ServerCoordinator};
use pterodactyl_panel::models::{
    Account, Pagination, PowerAction, ResourceUsage, Server, ServerInfoPayload, ServerPage,
    UtilizationPayload,
};

/// Utilization payload for a server in `state`
pub fn utilization(state: &str, memory_bytes: i64) -> UtilizationPayload {
    UtilizationPayload {
        current_state: Some(state.to_string()),
        is_suspended: Some(false),
        resources: Some(ResourceUsage {
            memory_bytes: Some(memory_bytes),
            cpu_absolute: Some(12.5),
            disk_bytes: Some(1_000_000),
            network_tx_bytes: Some(10),
            network_rx_bytes: Some(20),
            uptime: Some(3_600_000),
        }),
    }
}

/// Server info payload on `node`
pub fn info(node: &str) -> ServerInfoPayload {
    ServerInfoPayload {
        node: Some(node.to_string()),
        is_node_under_maintenance: Some(false),
    }
}

pub fn unauthorized() -> ApiError {
    ApiError::Http {
        status: 401,
        message: "Unauthenticated.".to_string(),
    }
}

pub fn unavailable() -> ApiError {
    ApiError::Http {
        status: 503,
        message: "Service Unavailable".to_string(),
    }
}

/// In-memory panel with scripted responses and call counters
///
/// Unscripted servers answer with a running utilization payload.
#[derive(Default)]
pub struct FakePanel {
    pages: Mutex<Vec<Vec<Server>>>,
    utilization: Mutex<HashMap<String, UtilizationPayload>>,
    info: Mutex<HashMap<String, ServerInfoPayload>>,
    delays: Mutex<HashMap<String, Duration>>,
    refresh_errors: Mutex<HashMap<String, ApiError>>,
    info_errors: Mutex<HashMap<String, ApiError>>,
    account_error: Mutex<Option<ApiError>>,
    list_error: Mutex<Option<ApiError>>,
    power_error: Mutex<Option<ApiError>>,
    utilization_calls: Mutex<HashMap<String, usize>>,
    info_calls: AtomicUsize,
    list_calls: AtomicUsize,
    account_calls: AtomicUsize,
    power_calls: Mutex<Vec<(String, PowerAction)>>,
}

impl FakePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel listing `ids` on a single page
    pub fn with_servers(ids: &[&str]) -> Self {
        let panel = Self::new();
        panel.set_pages(vec![ids.iter().map(|id| Server::new(*id, *id)).collect()]);
        panel
    }

    pub fn set_pages(&self, pages: Vec<Vec<Server>>) {
        *self.pages.lock().unwrap() = pages;
    }

    pub fn set_utilization(&self, server_id: &str, payload: UtilizationPayload) {
        self.utilization
            .lock()
            .unwrap()
            .insert(server_id.to_string(), payload);
    }

    pub fn set_info(&self, server_id: &str, payload: ServerInfoPayload) {
        self.info
            .lock()
            .unwrap()
            .insert(server_id.to_string(), payload);
    }

    /// Delay every utilization call for `server_id`
    pub fn set_delay(&self, server_id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(server_id.to_string(), delay);
    }

    /// Fail every utilization call for `server_id` until cleared
    pub fn fail_refresh(&self, server_id: &str, error: ApiError) {
        self.refresh_errors
            .lock()
            .unwrap()
            .insert(server_id.to_string(), error);
    }

    /// Fail every server info call for `server_id` until cleared
    pub fn fail_info(&self, server_id: &str, error: ApiError) {
        self.info_errors
            .lock()
            .unwrap()
            .insert(server_id.to_string(), error);
    }

    pub fn clear_info_error(&self, server_id: &str) {
        self.info_errors.lock().unwrap().remove(server_id);
    }

    pub fn clear_refresh_error(&self, server_id: &str) {
        self.refresh_errors.lock().unwrap().remove(server_id);
    }

    pub fn fail_account(&self, error: ApiError) {
        *self.account_error.lock().unwrap() = Some(error);
    }

    pub fn fail_list(&self, error: ApiError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    pub fn fail_power(&self, error: ApiError) {
        *self.power_error.lock().unwrap() = Some(error);
    }

    pub fn utilization_calls(&self, server_id: &str) -> usize {
        self.utilization_calls
            .lock()
            .unwrap()
            .get(server_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }

    pub fn power_calls(&self) -> Vec<(String, PowerAction)> {
        self.power_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PanelApi for FakePanel {
    async fn get_account(&self) -> ApiResult<Account> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.account_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Account {
            id: Some(1),
            username: Some("admin".to_string()),
            email: Some("admin@example.com".to_string()),
            admin: true,
        })
    }

    async fn list_servers(&self, page: u32) -> ApiResult<ServerPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }

        let pages = self.pages.lock().unwrap().clone();
        let total_pages = pages.len().max(1) as u32;
        let servers = pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        let total = pages.iter().map(Vec::len).sum::<usize>() as u64;

        Ok(ServerPage {
            pagination: Pagination {
                total,
                count: servers.len() as u64,
                per_page: 50,
                current_page: page,
                total_pages,
            },
            servers,
        })
    }

    async fn get_server_utilization(&self, server_id: &str) -> ApiResult<UtilizationPayload> {
        *self
            .utilization_calls
            .lock()
            .unwrap()
            .entry(server_id.to_string())
            .or_default() += 1;

        let delay = self.delays.lock().unwrap().get(server_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.refresh_errors.lock().unwrap().get(server_id).cloned() {
            return Err(err);
        }

        Ok(self
            .utilization
            .lock()
            .unwrap()
            .get(server_id)
            .cloned()
            .unwrap_or_else(|| utilization("running", 1024)))
    }

    async fn get_server_info(&self, server_id: &str) -> ApiResult<ServerInfoPayload> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.info_errors.lock().unwrap().get(server_id).cloned() {
            return Err(err);
        }
        Ok(self
            .info
            .lock()
            .unwrap()
            .get(server_id)
            .cloned()
            .unwrap_or_else(|| info("node-1")))
    }

    async fn send_power_action(&self, server_id: &str, action: PowerAction) -> ApiResult<()> {
        if let Some(err) = self.power_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.power_calls
            .lock()
            .unwrap()
            .push((server_id.to_string(), action));
        Ok(())
    }
}

/// Coordinator for `server_id` against `panel`
pub fn coordinator(
    panel: &Arc<FakePanel>,
    server_id: &str,
    config: CoordinatorConfig,
) -> Arc<ServerCoordinator> {
    let api: Arc<dyn PanelApi> = Arc::clone(panel) as Arc<dyn PanelApi>;
    Arc::new(ServerCoordinator::new(
        Server::new(server_id, format!("Server {server_id}")),
        api,
        config,
    ))
}
