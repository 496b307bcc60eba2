//! API-specific error types
//!
//! Classifies failures of bike API calls so callers can tell a signed-out
//! user from a flaky network.

use std::time::Duration;

use bike_common::auth::AuthError;
use bike_domain::BikeError;
use thiserror::Error;

use crate::http::SendError;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// No session, or the server refused the credentials (401, 403)
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth) and undecodable bodies
    Client,
    /// Network/connection errors and timeouts
    Network,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The user is signed out; the request was never sent
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::NotAuthenticated | Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) | Self::Decode(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// True when the user has to sign in again before retrying
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthenticated => Self::NotAuthenticated,
            other => Self::Auth(other.to_string()),
        }
    }
}

impl From<BikeError> for ApiError {
    fn from(err: BikeError) -> Self {
        match err {
            BikeError::Network(message) => Self::Network(message),
            BikeError::Auth(message) | BikeError::Security(message) => Self::Auth(message),
            BikeError::Config(message) => Self::Config(message),
            BikeError::NotFound(message) | BikeError::InvalidInput(message) => {
                Self::Client(message)
            }
            BikeError::Platform(message) | BikeError::Internal(message) => Self::Server(message),
        }
    }
}

impl From<ApiError> for BikeError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotAuthenticated | ApiError::Auth(_) => BikeError::Auth(err.to_string()),
            ApiError::Config(message) => BikeError::Config(message),
            ApiError::Client(_) | ApiError::Decode(_) => BikeError::InvalidInput(err.to_string()),
            ApiError::RateLimit(_)
            | ApiError::Server(_)
            | ApiError::Network(_)
            | ApiError::Timeout(_) => BikeError::Network(err.to_string()),
        }
    }
}

impl ApiError {
    pub(crate) fn from_send(err: SendError, timeout: Duration) -> Self {
        match err {
            SendError::Auth(auth) => auth.into(),
            SendError::Timeout => Self::Timeout(timeout),
            SendError::Transport(bike) => bike.into(),
        }
    }
}
