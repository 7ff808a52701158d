//! Typed HTTP client for the backend.
//!
//! Every authenticated request asks the [`SessionProvider`] for the current
//! bearer token. A missing session or a lookup failure sends the request
//! without one; the server decides what an anonymous caller may see.

use std::sync::Arc;
use std::time::Duration;

use propdash_core::types::{
    ActionResult, GroupPreference, GroupsResponse, PropertyResponse, ResponseStatus,
    WhatsAppGroup,
};
use propdash_core::{FilterCriteria, StatusPayload};
use serde::de::DeserializeOwned;

use crate::endpoints;
use crate::error::ApiError;
use crate::session::SessionProvider;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    sessions: Arc<dyn SessionProvider>,
}

impl BackendClient {
    pub fn new(config: BackendConfig, sessions: Arc<dyn SessionProvider>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url,
            sessions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, endpoints::join(&self.base_url, path))
    }

    async fn authorized(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::RequestBuilder {
        let builder = self.request(method, path);
        match self.sessions.get_session().await {
            Ok(Some(session)) => builder.bearer_auth(session.access_token),
            Ok(None) => {
                tracing::debug!("no session; sending {path} unauthenticated");
                builder
            }
            Err(e) => {
                tracing::warn!("session lookup failed, sending {path} unauthenticated: {e}");
                builder
            }
        }
    }

    /// Send and return the raw success body, mapping non-2xx to [`ApiError`].
    async fn send_raw(builder: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        let body = String::from_utf8_lossy(&bytes);
        let transport = status
            .canonical_reason()
            .map(|r| format!("HTTP {} {r}", status.as_u16()))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(ApiError::from_status(status.as_u16(), &body, &transport))
    }

    async fn send_json<T: DeserializeOwned>(
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let bytes = Self::send_raw(builder).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    // ─── Connection ──────────────────────────────────────────────

    pub async fn public_status(&self) -> Result<StatusPayload, ApiError> {
        Self::send_json(self.request(reqwest::Method::GET, endpoints::PUBLIC_STATUS)).await
    }

    pub async fn my_status(&self) -> Result<StatusPayload, ApiError> {
        let builder = self.authorized(reqwest::Method::GET, endpoints::MY_STATUS).await;
        Self::send_json(builder).await
    }

    pub async fn start_connection(&self) -> Result<StatusPayload, ApiError> {
        let builder = self.authorized(reqwest::Method::POST, endpoints::CONNECT).await;
        let payload: StatusPayload = Self::send_json(builder).await?;
        tracing::info!(
            qr = payload.qr_code.as_deref().is_some_and(|q| !q.is_empty()),
            "connection start requested"
        );
        Ok(payload)
    }

    /// Destructive reset of the linked account. Never called automatically.
    pub async fn force_logout(&self) -> Result<ActionResult, ApiError> {
        let builder = self
            .authorized(reqwest::Method::POST, endpoints::FORCE_LOGOUT)
            .await;
        Self::send_json(builder).await
    }

    pub async fn disconnect(&self) -> Result<ActionResult, ApiError> {
        let builder = self
            .authorized(reqwest::Method::POST, endpoints::DISCONNECT)
            .await;
        Self::send_json(builder).await
    }

    // ─── Groups ──────────────────────────────────────────────────

    pub async fn list_groups(&self) -> Result<Vec<WhatsAppGroup>, ApiError> {
        let builder = self.authorized(reqwest::Method::GET, endpoints::GROUPS).await;
        let resp: GroupsResponse = Self::send_json(builder).await?;
        Ok(resp.groups)
    }

    pub async fn update_group_preferences(
        &self,
        preferences: &[GroupPreference],
    ) -> Result<ActionResult, ApiError> {
        let builder = self
            .authorized(reqwest::Method::PUT, endpoints::GROUPS)
            .await
            .json(&serde_json::json!({ "preferences": preferences }));
        Self::send_json(builder).await
    }

    // ─── Properties ──────────────────────────────────────────────

    pub async fn query_properties(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<PropertyResponse, ApiError> {
        let builder = self
            .authorized(reqwest::Method::GET, endpoints::PROPERTIES)
            .await
            .query(&criteria.to_query_pairs());
        let resp: PropertyResponse = Self::send_json(builder).await?;
        if resp.status == ResponseStatus::Error {
            return Err(ApiError::Server {
                status: 200,
                message: resp
                    .message
                    .unwrap_or_else(|| "Failed to fetch properties".to_string()),
            });
        }
        Ok(resp)
    }

    /// CSV bytes for every listing matching `criteria`, without a page limit.
    pub async fn export_properties_csv(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<u8>, ApiError> {
        let builder = self
            .authorized(reqwest::Method::GET, endpoints::PROPERTIES_EXPORT_CSV)
            .await
            .query(&criteria.for_export());
        Self::send_raw(builder).await
    }
}
