//! Capability traits consumed by the status poller.

use std::sync::Arc;

use propdash_core::StatusPayload;
use propdash_core::types::ActionResult;

use crate::client::BackendClient;
use crate::error::ApiError;

/// Where connection status snapshots come from.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<StatusPayload, ApiError>;
    async fn start_connection(&self) -> Result<StatusPayload, ApiError>;
}

#[async_trait::async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn fetch_status(&self) -> Result<StatusPayload, ApiError> {
        (**self).fetch_status().await
    }

    async fn start_connection(&self) -> Result<StatusPayload, ApiError> {
        (**self).start_connection().await
    }
}

/// Authenticated status for the signed-in user.
#[async_trait::async_trait]
impl StatusSource for BackendClient {
    async fn fetch_status(&self) -> Result<StatusPayload, ApiError> {
        self.my_status().await
    }

    async fn start_connection(&self) -> Result<StatusPayload, ApiError> {
        BackendClient::start_connection(self).await
    }
}

/// Read-only, unauthenticated status.
pub struct PublicStatusSource {
    client: BackendClient,
}

impl PublicStatusSource {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl StatusSource for PublicStatusSource {
    async fn fetch_status(&self) -> Result<StatusPayload, ApiError> {
        self.client.public_status().await
    }

    async fn start_connection(&self) -> Result<StatusPayload, ApiError> {
        Err(ApiError::Auth(
            "public status is read-only; sign in to connect".into(),
        ))
    }
}

/// Destructive account operations, offered to the user and never automatic.
#[async_trait::async_trait]
pub trait ConnectionAdmin: Send + Sync {
    async fn reset_connection(&self) -> Result<ActionResult, ApiError>;
}

#[async_trait::async_trait]
impl ConnectionAdmin for BackendClient {
    async fn reset_connection(&self) -> Result<ActionResult, ApiError> {
        tracing::info!("force logout requested");
        self.force_logout().await
    }
}

#[async_trait::async_trait]
impl<T: ConnectionAdmin + ?Sized> ConnectionAdmin for Arc<T> {
    async fn reset_connection(&self) -> Result<ActionResult, ApiError> {
        (**self).reset_connection().await
    }
}
