//! Access token lifecycle for the Microsoft engine

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::core::config::ServiceConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::Credential;

/// Header carrying the subscription key on the authentication call
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Acquires and refreshes bearer tokens
#[derive(Debug, Clone)]
pub struct CredentialManager {
    client: reqwest::Client,
    auth_url: String,
    validity: Duration,
    timeout: std::time::Duration,
}

impl CredentialManager {
    /// Create a manager sharing the caller's HTTP client
    pub fn new(client: reqwest::Client, service: &ServiceConfig) -> Self {
        Self {
            client,
            auth_url: service.microsoft_auth_url.clone(),
            validity: service.token_validity(),
            timeout: std::time::Duration::from_millis(service.timeout_ms),
        }
    }

    /// Perform one authentication call. Failures are returned, never retried.
    pub async fn acquire(&self, key: &str) -> Result<Arc<Credential>> {
        debug!("Requesting access token from {}", self.auth_url);

        let response = self
            .client
            .post(&self.auth_url)
            .timeout(self.timeout)
            .header(SUBSCRIPTION_KEY_HEADER, key)
            .body("")
            .send()
            .await
            .map_err(TranslationError::network)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::AuthenticationError {
                status: status.as_u16(),
                message,
            });
        }

        let token = response
            .text()
            .await
            .map_err(TranslationError::invalid_response)?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(TranslationError::InvalidResponseError {
                message: "Authentication endpoint returned an empty token".to_string(),
            });
        }

        let credential = Credential::new(token, self.validity);
        info!("Acquired access token valid until {}", credential.expires_at);
        Ok(Arc::new(credential))
    }

    /// Return `credential` untouched while it is live, otherwise acquire a new one
    pub async fn refresh(&self, credential: Arc<Credential>, key: &str) -> Result<Arc<Credential>> {
        if !credential.is_expired() {
            return Ok(credential);
        }

        info!(
            "Access token expired at {}, refreshing",
            credential.expires_at
        );
        self.acquire(key).await
    }
}

/// Shared slot for the current credential, handed to every task of a batch.
///
/// Refreshes are not deduplicated: tasks that observe expiry at the same time
/// each acquire their own token, and the latest-expiring one is kept.
#[derive(Debug, Clone)]
pub struct CredentialHolder {
    current: Arc<RwLock<Arc<Credential>>>,
}

impl CredentialHolder {
    pub fn new(credential: Arc<Credential>) -> Self {
        Self {
            current: Arc::new(RwLock::new(credential)),
        }
    }

    /// Snapshot of the current credential
    pub async fn current(&self) -> Arc<Credential> {
        self.current.read().await.clone()
    }

    /// Store `credential` unless a later-expiring one is already held
    pub async fn replace(&self, credential: Arc<Credential>) {
        let mut current = self.current.write().await;
        if credential.expires_at > current.expires_at {
            *current = credential;
        }
    }

    /// Refresh through `manager` if the held credential is expired and return a usable one
    pub async fn refresh(&self, manager: &CredentialManager, key: &str) -> Result<Arc<Credential>> {
        let current = self.current().await;
        let next = manager.refresh(current.clone(), key).await?;
        if !Arc::ptr_eq(&current, &next) {
            self.replace(next.clone()).await;
        }
        Ok(next)
    }
}
