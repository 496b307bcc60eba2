//! Authorization storage layered on top of a [`SecretStore`].
//!
//! The generic secret backend (`security::keychain` in production, the
//! in-memory mock in tests) only knows about string secrets. This module owns
//! the authorization-specific part: a single JSON record under a fixed key,
//! readable by every process sharing the keychain service.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::traits::AuthorizationStore;
use crate::auth::types::Authorization;
use crate::security::{KeychainError, SecretStore};

/// Key the authorization record is stored under
pub const AUTHORIZATION_KEY: &str = "bike.authorization";

/// Errors raised by the authorization store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize authorization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("secure store unavailable: {0}")]
    Backend(#[from] KeychainError),
}

/// [`AuthorizationStore`] persisting JSON in a [`SecretStore`]
///
/// Concurrent writers from different processes are not coordinated: the last
/// write wins, and readers must re-read before trusting freshness.
#[derive(Debug, Clone)]
pub struct SecureTokenStore<S> {
    secrets: S,
    key: String,
}

impl<S: SecretStore> SecureTokenStore<S> {
    /// Store under [`AUTHORIZATION_KEY`]
    pub fn new(secrets: S) -> Self {
        Self::with_key(secrets, AUTHORIZATION_KEY)
    }

    pub fn with_key(secrets: S, key: impl Into<String>) -> Self {
        Self { secrets, key: key.into() }
    }

    /// Underlying secret backend
    pub fn secrets(&self) -> &S {
        &self.secrets
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<S: SecretStore> AuthorizationStore for SecureTokenStore<S> {
    async fn write(&self, authorization: &Authorization) -> Result<(), StoreError> {
        let payload = serde_json::to_string(authorization)?;
        self.secrets.set_secret(&self.key, &payload)?;

        debug!(key = %self.key, expires_at = %authorization.expires_at, "Authorization stored");
        Ok(())
    }

    async fn read(&self) -> Option<Authorization> {
        let payload = match self.secrets.get_secret(&self.key) {
            Ok(payload) => payload,
            Err(KeychainError::NotFound) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read authorization");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(authorization) => Some(authorization),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable authorization");
                None
            }
        }
    }

    async fn delete(&self) -> Result<(), StoreError> {
        self.secrets.delete_secret(&self.key)?;
        debug!(key = %self.key, "Authorization deleted");
        Ok(())
    }
}
