//! HTTP client for the Pterodactyl client API
//!
//! Every call is a single request: there is no retry loop here, the
//! coordinator's polling period is the only retry policy.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ApiError, ApiResult, PanelApi};
use crate::models::{
    Account, Pagination, PowerAction, Server, ServerInfoPayload, ServerPage, UtilizationPayload,
};

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the panel client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Panel base URL, e.g. `https://panel.example.com`
    pub base_url: String,

    /// Client API key
    pub api_key: String,

    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a new client config
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Wire envelopes
// ============================================================================

/// Single-object response: `{"object": "...", "attributes": {...}}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    attributes: T,
}

/// List response with pagination metadata
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    data: Vec<Envelope<T>>,
    #[serde(default)]
    meta: Option<ListMeta>,
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
struct PowerRequest {
    signal: PowerAction,
}

// ============================================================================
// Panel Client
// ============================================================================

/// Authenticated client for one panel
pub struct PanelClient {
    base_url: String,
    http_client: Client,
}

impl PanelClient {
    /// Create a new panel client
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidConfig` if the URL or key is unusable
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let parsed = url::Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid panel URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidConfig(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::InvalidConfig("API key is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ApiError::InvalidConfig("API key contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http_client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(format!("pterodactyl-panel/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/client{}", self.base_url, path)
    }

    // Internal: GET and decode a JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        tracing::trace!(url = %url, "GET");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    // Internal: map non-success statuses to ApiError::Http
    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(ApiError::Http {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl PanelApi for PanelClient {
    async fn get_account(&self) -> ApiResult<Account> {
        let url = self.endpoint("/account");
        let envelope: Envelope<Account> = self.get_json(&url).await?;
        Ok(envelope.attributes)
    }

    async fn list_servers(&self, page: u32) -> ApiResult<ServerPage> {
        let url = format!("{}?page={}", self.endpoint(""), page);
        let list: ListEnvelope<Server> = self.get_json(&url).await?;

        let servers: Vec<Server> = list.data.into_iter().map(|e| e.attributes).collect();
        let pagination = match list.meta {
            Some(meta) => meta.pagination,
            None => Pagination::single(servers.len() as u64),
        };

        Ok(ServerPage {
            servers,
            pagination,
        })
    }

    async fn get_server_utilization(&self, server_id: &str) -> ApiResult<UtilizationPayload> {
        let url = self.endpoint(&format!("/servers/{server_id}/resources"));
        let envelope: Envelope<UtilizationPayload> = self.get_json(&url).await?;
        Ok(envelope.attributes)
    }

    async fn get_server_info(&self, server_id: &str) -> ApiResult<ServerInfoPayload> {
        let url = self.endpoint(&format!("/servers/{server_id}"));
        let envelope: Envelope<ServerInfoPayload> = self.get_json(&url).await?;
        Ok(envelope.attributes)
    }

    async fn send_power_action(&self, server_id: &str, action: PowerAction) -> ApiResult<()> {
        let url = self.endpoint(&format!("/servers/{server_id}/power"));
        tracing::trace!(url = %url, signal = %action, "POST");

        let response = self
            .http_client
            .post(&url)
            .json(&PowerRequest { signal: action })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::check_status(response).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
