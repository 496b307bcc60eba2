//! Conversions from external infrastructure errors into domain errors.

use bike_common::auth::{AuthError, StoreError};
use bike_common::KeychainError;
use bike_domain::BikeError;
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BikeError);

impl From<InfraError> for BikeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BikeError> for InfraError {
    fn from(value: BikeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBikeError {
    fn into_bike(self) -> BikeError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → BikeError */
/* -------------------------------------------------------------------------- */

impl IntoBikeError for KeyringError {
    fn into_bike(self) -> BikeError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => BikeError::NotFound("keychain entry not found".into()),
            BadEncoding(_) => {
                BikeError::Security("credential in keychain is not valid UTF-8".into())
            }
            PlatformFailure(err) => BikeError::Security(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                BikeError::Security(format!("unable to access secure storage: {err}"))
            }
            _ => BikeError::Security(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_bike())
    }
}

/* -------------------------------------------------------------------------- */
/* KeychainError / StoreError → BikeError */
/* -------------------------------------------------------------------------- */

impl IntoBikeError for KeychainError {
    fn into_bike(self) -> BikeError {
        match self {
            KeychainError::NotFound => BikeError::NotFound("keychain entry not found".into()),
            KeychainError::AccessFailed(message) => BikeError::Security(message),
            KeychainError::Serialization(err) => {
                BikeError::Internal(format!("keychain payload could not be encoded: {err}"))
            }
        }
    }
}

impl From<KeychainError> for InfraError {
    fn from(value: KeychainError) -> Self {
        InfraError(value.into_bike())
    }
}

impl From<StoreError> for InfraError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Backend(err) => err.into(),
            StoreError::Serialization(err) => {
                InfraError(BikeError::Internal(format!("authorization could not be encoded: {err}")))
            }
        }
    }
}

/* -------------------------------------------------------------------------- */
/* AuthError → BikeError */
/* -------------------------------------------------------------------------- */

impl IntoBikeError for AuthError {
    fn into_bike(self) -> BikeError {
        match self {
            AuthError::Store(message) => BikeError::Security(message),
            AuthError::SignInUnavailable => BikeError::Platform(self.to_string()),
            other => BikeError::Auth(other.to_string()),
        }
    }
}

impl From<AuthError> for InfraError {
    fn from(value: AuthError) -> Self {
        InfraError(value.into_bike())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BikeError */
/* -------------------------------------------------------------------------- */

impl IntoBikeError for HttpError {
    fn into_bike(self) -> BikeError {
        if self.is_timeout() {
            return BikeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BikeError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return BikeError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => BikeError::Auth(message),
                404 => BikeError::NotFound(message),
                400..=499 => BikeError::InvalidInput(message),
                _ => BikeError::Network(message),
            };
        }

        BikeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bike())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
