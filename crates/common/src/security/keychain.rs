//! Platform keychain provider for secure credential storage
//!
//! Thin wrapper over the platform keychain (macOS Keychain Services, Windows
//! Credential Manager, Linux Secret Service) through the `keyring` crate.
//!
//! The service name doubles as the sharing boundary: every process of the
//! application group (app, widgets, watch companion) opens the same service
//! and therefore sees the same entries.
//!
//! ## Usage
//!
//! ```no_run
//! use bike_common::security::{KeychainProvider, SecretStore};
//!
//! let keychain = KeychainProvider::new("tech.conneq.decathlon.shared");
//! keychain.set_secret("bike.authorization", "{...}")?;
//! let secret = keychain.get_secret("bike.authorization")?;
//! # Ok::<(), bike_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use tracing::debug;

use super::traits::{KeychainError, SecretStore};

/// Keychain-backed [`SecretStore`]
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Examples
    /// ```
    /// use bike_common::security::KeychainProvider;
    ///
    /// let keychain = KeychainProvider::new("tech.conneq.decathlon.shared");
    /// assert_eq!(keychain.service_name(), "tech.conneq.decathlon.shared");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Service identifier entries are stored under
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, key: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {}", e))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {}: {}", key, e))
        })?;

        debug!(service = %self.service_name, key = %key, "Secret stored");
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {}: {}", key, e))
            }
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {}: {}",
                key, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service_name() -> String {
        format!("BikeTestSecrets.{}", std::process::id())
    }

    #[test]
    fn test_keychain_provider_creation() {
        let keychain = KeychainProvider::new("tech.conneq.decathlon.shared");
        assert_eq!(keychain.service_name(), "tech.conneq.decathlon.shared");
    }

    /// Exercises the real platform keychain.
    ///
    /// Assertions:
    /// - Confirms a stored secret is read back unchanged.
    /// - Ensures deleting twice succeeds and leaves `NotFound` behind.
    #[test]
    #[ignore = "requires an unlocked platform keychain"]
    fn test_set_get_and_delete_secret() {
        let keychain = KeychainProvider::new(test_service_name());

        keychain.set_secret("roundtrip", "super-secret").unwrap();
        assert_eq!(keychain.get_secret("roundtrip").unwrap(), "super-secret");

        keychain.delete_secret("roundtrip").unwrap();
        keychain.delete_secret("roundtrip").unwrap();
        assert!(matches!(keychain.get_secret("roundtrip"), Err(KeychainError::NotFound)));
    }
}
