//! Trait abstractions for security components
//!
//! Lets the auth layer persist secrets without depending on a specific
//! backend (platform keychain in production, in-memory map in tests).

use thiserror::Error;

// ============================================================================
// Secret Storage
// ============================================================================

/// Errors raised by secret storage backends
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Backend rejected the operation
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// No secret stored under the requested key
    #[error("Entry not found")]
    NotFound,

    /// Secret could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/value store for secret strings
///
/// Implementations must be safe to share between threads. Concurrent writers
/// are resolved by the backend (last writer wins); callers that need fresh
/// data re-read instead of caching.
pub trait SecretStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the write
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Retrieve the value stored under `key`
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if nothing is stored under `key`
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Delete the value stored under `key` (idempotent)
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the delete
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    /// Check whether a value is stored under `key`
    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}
