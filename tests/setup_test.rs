//! Integration tests for setup, discovery, entities and configuration

mod common;

use common::{unauthorized, unavailable, FakePanel};
use pterodactyl_panel::api::PanelApi;
use pterodactyl_panel::config::Config;
use pterodactyl_panel::coordinator::{CoordinatorConfig, CoordinatorState};
use pterodactyl_panel::entities::Platform;
use pterodactyl_panel::error::Error;
use pterodactyl_panel::models::{PowerAction, Server};
use pterodactyl_panel::setup::{collect_servers, validate_credentials, ConfigEntry, Integration};
use pterodactyl_panel::snapshot::{keys, MetricValue};
use serde_json::json;
use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn servers(ids: &[&str]) -> Vec<Server> {
    ids.iter().map(|id| Server::new(*id, format!("Game {id}"))).collect()
}

fn entry() -> ConfigEntry {
    ConfigEntry::new("https://panel.example.com", "ptlc_test").with_entry_id("entry-1")
}

async fn setup(panel: &Arc<FakePanel>) -> Result<Integration, Error> {
    let api: Arc<dyn PanelApi> = Arc::clone(panel) as Arc<dyn PanelApi>;
    Integration::setup(entry(), api, CoordinatorConfig::default()).await
}

// ============================================================================
// Discovery
// ============================================================================

/// Test all pages are walked and merged in order
#[tokio::test]
async fn test_collect_servers_all_pages() {
    let panel = FakePanel::new();
    panel.set_pages(vec![
        servers(&["a1", "a2"]),
        servers(&["b1", "b2"]),
        servers(&["c1"]),
    ]);

    let found = collect_servers(&panel).await.unwrap();
    let ids: Vec<_> = found.iter().map(|s| s.identifier.as_str()).collect();

    assert_eq!(ids, vec!["a1", "a2", "b1", "b2", "c1"]);
    assert_eq!(panel.list_calls(), 3);
}

/// Test a server listed on two pages appears once
#[tokio::test]
async fn test_collect_servers_dedupes() {
    let panel = FakePanel::new();
    panel.set_pages(vec![servers(&["a1", "a2"]), servers(&["a2", "b1"])]);

    let found = collect_servers(&panel).await.unwrap();
    let ids: Vec<_> = found.iter().map(|s| s.identifier.as_str()).collect();

    assert_eq!(ids, vec!["a1", "a2", "b1"]);
}

/// Test an empty panel yields no servers after one request
#[tokio::test]
async fn test_collect_servers_empty() {
    let panel = FakePanel::new();

    assert!(collect_servers(&panel).await.unwrap().is_empty());
    assert_eq!(panel.list_calls(), 1);
}

/// Test credential failures are classified
#[tokio::test]
async fn test_validate_credentials_classification() {
    let panel = FakePanel::new();
    assert!(validate_credentials(&panel).await.is_ok());

    panel.fail_account(unauthorized());
    let err = validate_credentials(&panel).await.unwrap_err();
    assert!(err.is_auth_failure());

    panel.fail_account(unavailable());
    let err = validate_credentials(&panel).await.unwrap_err();
    assert!(matches!(err, Error::NotReady { .. }));
}

// ============================================================================
// Setup lifecycle
// ============================================================================

/// Test setup creates one ready coordinator per server
#[tokio::test]
async fn test_setup_creates_coordinators() {
    let panel = Arc::new(FakePanel::new());
    panel.set_pages(vec![servers(&["a1", "a2"]), servers(&["b1"])]);

    let integration = setup(&panel).await.unwrap();

    assert_eq!(integration.coordinators().len(), 3);
    for coordinator in integration.coordinators() {
        assert_eq!(coordinator.state(), CoordinatorState::Ready);
    }
    assert_eq!(panel.utilization_calls("a1"), 1);
    assert!(integration.coordinator("b1").is_some());
    assert!(integration.coordinator("zz").is_none());

    integration.unload().await;
}

/// Test a rejected key fails setup as an auth failure
#[tokio::test]
async fn test_setup_auth_failure() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    panel.fail_account(unauthorized());

    let err = setup(&panel).await.unwrap_err();
    assert!(err.is_auth_failure());
    assert_eq!(panel.list_calls(), 0);
}

/// Test a 401 while listing servers fails setup as an auth failure
#[tokio::test]
async fn test_setup_list_unauthorized() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    panel.fail_list(unauthorized());

    assert!(setup(&panel).await.unwrap_err().is_auth_failure());
}

/// Test an unreachable panel fails setup as not ready
#[tokio::test]
async fn test_setup_not_ready() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    panel.fail_list(unavailable());

    let err = setup(&panel).await.unwrap_err();
    assert!(matches!(err, Error::NotReady { .. }));
}

/// Test a 401 on the initial refresh fails setup
#[tokio::test]
async fn test_setup_initial_refresh_unauthorized() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    panel.fail_refresh("a1", unauthorized());

    assert!(setup(&panel).await.unwrap_err().is_auth_failure());
}

/// Test a transient failure on the initial refresh does not fail setup
#[tokio::test]
async fn test_setup_initial_refresh_transient() {
    let panel = Arc::new(FakePanel::with_servers(&["a1", "a2"]));
    panel.fail_refresh("a2", unavailable());

    let integration = setup(&panel).await.unwrap();

    let a2 = integration.coordinator("a2").unwrap();
    assert_eq!(a2.state(), CoordinatorState::Uninitialized);
    assert!(!a2.last_update_success());
    assert_eq!(
        integration.coordinator("a1").unwrap().state(),
        CoordinatorState::Ready
    );

    integration.unload().await;
}

/// Test invalid settings are rejected before any call
#[tokio::test]
async fn test_setup_invalid_settings() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    let api: Arc<dyn PanelApi> = Arc::clone(&panel) as Arc<dyn PanelApi>;
    let settings = CoordinatorConfig {
        scan_interval_secs: 0,
        ..CoordinatorConfig::default()
    };

    let err = Integration::setup(entry(), api, settings).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(panel.account_calls(), 0);
}

/// Test reload rebuilds coordinators from a fresh server list
#[tokio::test]
async fn test_reload() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    let integration = setup(&panel).await.unwrap();
    assert_eq!(integration.coordinators().len(), 1);

    panel.set_pages(vec![servers(&["a1", "a2"])]);
    let integration = integration.reload().await.unwrap();

    assert_eq!(integration.coordinators().len(), 2);
    assert_eq!(panel.account_calls(), 2);
    integration.unload().await;
}

/// Test auth failures after setup are reported on the re-auth channel
#[tokio::test]
async fn test_reauth_request_after_setup() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    let mut integration = setup(&panel).await.unwrap();
    let mut requests = integration.take_reauth_requests().unwrap();
    assert!(integration.take_reauth_requests().is_none());

    panel.fail_power(unauthorized());
    let coordinator = Arc::clone(integration.coordinator("a1").unwrap());
    assert!(coordinator
        .send_power_action(PowerAction::Start)
        .await
        .unwrap_err()
        .is_auth_failure());

    let request = requests.recv().await.unwrap();
    assert_eq!(request.server_id, "a1");

    integration.unload().await;
}

// ============================================================================
// Entities
// ============================================================================

/// Test entities are created from the snapshot keys
#[tokio::test]
async fn test_entities() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    let integration = setup(&panel).await.unwrap();

    let entities = integration.entities();
    let count = |platform| entities.iter().filter(|e| e.platform() == platform).count();
    assert_eq!(count(Platform::Sensor), 8);
    assert_eq!(count(Platform::BinarySensor), 2);
    assert_eq!(count(Platform::Button), 3);
    assert_eq!(count(Platform::Switch), 1);

    let memory = entities.iter().find(|e| e.key() == keys::MEMORY).unwrap();
    assert_eq!(memory.unique_id(), "entry-1_a1_memory");
    assert_eq!(memory.device().identifier, "entry-1_server_a1");
    assert_eq!(memory.device().name, "Server a1");
    assert_eq!(memory.state().value, Some(MetricValue::Int(1024)));
    assert!(memory.state().available);

    let switch = entities
        .iter()
        .find(|e| e.platform() == Platform::Switch)
        .unwrap();
    assert_eq!(switch.is_on(), Some(true));

    integration.unload().await;
}

/// Test sensors are skipped for keys the panel did not report
#[tokio::test]
async fn test_entities_without_snapshot() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    panel.fail_refresh("a1", unavailable());
    let integration = setup(&panel).await.unwrap();

    let entities = integration.entities();
    assert_eq!(entities.len(), 4);
    assert!(entities
        .iter()
        .all(|e| matches!(e.platform(), Platform::Button | Platform::Switch)));
    assert!(entities.iter().all(|e| !e.state().available));

    integration.unload().await;
}

/// Test buttons and the switch send power actions
#[tokio::test]
async fn test_entity_actions() {
    let panel = Arc::new(FakePanel::with_servers(&["a1"]));
    let integration = setup(&panel).await.unwrap();
    let entities = integration.entities();

    let by_key = |key: &str| entities.iter().find(|e| e.key() == key).unwrap();

    by_key("server_restart").press().await.unwrap();
    by_key("power_switch").turn_off().await.unwrap();
    by_key("power_switch").turn_on().await.unwrap();

    assert_eq!(
        panel.power_calls(),
        vec![
            ("a1".to_string(), PowerAction::Restart),
            ("a1".to_string(), PowerAction::Stop),
            ("a1".to_string(), PowerAction::Start),
        ]
    );

    // Sensors cannot be pressed or switched
    assert!(matches!(
        by_key(keys::CPU).press().await,
        Err(Error::ValidationFailure { .. })
    ));
    assert!(by_key("server_start").turn_on().await.is_err());

    integration.unload().await;
}

// ============================================================================
// Re-authentication against a mock panel
// ============================================================================

async fn mount_panel(mock_server: &MockServer, key: &str) {
    let bearer = format!("Bearer {key}");

    Mock::given(method("GET"))
        .and(path("/api/client/account"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "user",
            "attributes": { "id": 1, "username": "admin", "admin": true }
        })))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/client"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{
                "object": "server",
                "attributes": { "identifier": "abc123", "name": "Minecraft" }
            }],
            "meta": { "pagination": {
                "total": 1, "count": 1, "per_page": 50, "current_page": 1, "total_pages": 1
            }}
        })))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/client/servers/abc123/resources"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "stats",
            "attributes": { "current_state": "offline", "is_suspended": false }
        })))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/client/servers/abc123"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "server",
            "attributes": { "node": "node-1", "is_node_under_maintenance": false }
        })))
        .mount(mock_server)
        .await;
}

/// Test reauthenticate swaps the key and sets up again
#[tokio::test]
async fn test_reauthenticate() {
    let mock_server = MockServer::start().await;
    mount_panel(&mock_server, "old_key").await;
    mount_panel(&mock_server, "new_key").await;

    let entry = ConfigEntry::new(mock_server.uri(), "old_key");
    let integration = Integration::connect(entry, CoordinatorConfig::default())
        .await
        .unwrap();
    assert_eq!(integration.coordinators().len(), 1);

    let integration = integration.reauthenticate("new_key").await.unwrap();
    assert_eq!(integration.entry().api_key, "new_key");

    let coordinator = integration.coordinator("abc123").unwrap();
    assert_eq!(coordinator.state(), CoordinatorState::Ready);
    assert_eq!(
        coordinator.snapshot().unwrap().get_str(keys::CURRENT_STATE),
        Some("offline")
    );

    integration.unload().await;
}

/// Test reauthenticate with a rejected key reports an auth failure
#[tokio::test]
async fn test_reauthenticate_rejected() {
    let mock_server = MockServer::start().await;
    mount_panel(&mock_server, "old_key").await;

    Mock::given(method("GET"))
        .and(path("/api/client/account"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let entry = ConfigEntry::new(mock_server.uri(), "old_key");
    let integration = Integration::connect(entry, CoordinatorConfig::default())
        .await
        .unwrap();

    let err = integration.reauthenticate("wrong_key").await.unwrap_err();
    assert!(err.is_auth_failure());
}

// ============================================================================
// Configuration
// ============================================================================

/// Test loading a TOML config file
#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[panel]
host = "https://panel.example.com"
api_key = "ptlc_file"
request_timeout_secs = 5

[polling]
scan_interval_secs = 30

[logging]
level = "debug"
format = "json"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.panel.api_key, "ptlc_file");
    assert_eq!(config.request_timeout().as_secs(), 5);
    assert_eq!(config.coordinator_config().scan_interval_secs, 30);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.entry().host, "https://panel.example.com");
}

/// Test a missing file is an error
#[test]
fn test_config_missing_file() {
    assert!(Config::from_file(std::path::Path::new("/nonexistent/panel.toml")).is_err());
}

fn clear_env() {
    for var in [
        "PTERODACTYL_HOST",
        "PTERODACTYL_API_KEY",
        "PTERODACTYL_SCAN_INTERVAL_SECS",
        "PTERODACTYL_REQUEST_TIMEOUT_SECS",
        "PTERODACTYL_LOG_LEVEL",
        "PTERODACTYL_LOG_FORMAT",
    ] {
        std::env::remove_var(var);
    }
}

/// Test loading configuration from the environment
#[test]
#[serial]
fn test_config_from_env() {
    clear_env();
    std::env::set_var("PTERODACTYL_HOST", "http://localhost:8080");
    std::env::set_var("PTERODACTYL_API_KEY", "ptlc_env");
    std::env::set_var("PTERODACTYL_SCAN_INTERVAL_SECS", "15");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.panel.host, "http://localhost:8080");
    assert_eq!(config.polling.scan_interval_secs, 15);
    assert_eq!(config.panel.request_timeout_secs, 10);
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

/// Test missing required variables are reported
#[test]
#[serial]
fn test_config_from_env_missing_key() {
    clear_env();
    std::env::set_var("PTERODACTYL_HOST", "http://localhost:8080");

    let result = Config::from_env();
    clear_env();

    assert!(result.is_err());
}

/// Test malformed numeric variables fall back to the defaults
#[test]
#[serial]
fn test_config_from_env_malformed_numbers() {
    clear_env();
    std::env::set_var("PTERODACTYL_HOST", "http://localhost:8080");
    std::env::set_var("PTERODACTYL_API_KEY", "ptlc_env");
    std::env::set_var("PTERODACTYL_SCAN_INTERVAL_SECS", "every minute");
    std::env::set_var("PTERODACTYL_REQUEST_TIMEOUT_SECS", "-5");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.polling.scan_interval_secs, 60);
    assert_eq!(config.panel.request_timeout_secs, 10);
}
