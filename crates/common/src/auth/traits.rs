//! Traits for the authentication seams
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (identity provider, browser session, secure store)
//! and by letting HTTP consumers depend on an authenticator without knowing
//! its implementation.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::authenticator::AuthError;
use super::client::OAuthClientError;
use super::keychain::StoreError;
use super::types::Authorization;

/// Trait for OAuth client operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Run the interactive authorization-code + PKCE flow
    ///
    /// # Errors
    /// Returns [`OAuthClientError::Cancelled`] when the user abandons the
    /// login page, or any transport/protocol failure of the exchange.
    async fn authorize(
        &self,
        user_agent: &dyn ExternalUserAgent,
    ) -> Result<Authorization, OAuthClientError>;

    /// Exchange the refresh token for a new authorization
    ///
    /// # Errors
    /// Returns error if the token endpoint rejects the refresh token or the
    /// response cannot be decoded
    async fn refresh(&self, authorization: &Authorization)
        -> Result<Authorization, OAuthClientError>;
}

/// Failures reported by an [`ExternalUserAgent`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserAgentError {
    /// User closed the login page
    #[error("user cancelled the sign-in")]
    Cancelled,

    /// No way to present a login page here
    #[error("no browser session available: {0}")]
    Unavailable(String),

    /// Callback did not arrive in time
    #[error("sign-in was not completed within {0:?}")]
    TimedOut(Duration),

    /// Any other browser session failure
    #[error("browser session failed: {0}")]
    Failed(String),
}

/// Interactive browser session presenting the provider's login page
///
/// Implementations open `url` and resolve with the full callback URL once the
/// provider redirects to a URL using `callback_scheme`.
#[async_trait]
pub trait ExternalUserAgent: Send + Sync {
    /// Show `url` and wait for the redirect back to `callback_scheme`
    ///
    /// # Errors
    /// Returns [`UserAgentError::Cancelled`] when the user closes the page
    async fn present(&self, url: &Url, callback_scheme: &str) -> Result<Url, UserAgentError>;
}

/// Cross-process persistence of the current [`Authorization`]
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Persist `authorization`, replacing any previous record
    ///
    /// # Errors
    /// Returns error if the backend rejects the write
    async fn write(&self, authorization: &Authorization) -> Result<(), StoreError>;

    /// Load the stored authorization
    ///
    /// Missing and unreadable records both yield `None`.
    async fn read(&self) -> Option<Authorization>;

    /// Remove the stored authorization (no-op when absent)
    ///
    /// # Errors
    /// Returns error if the backend rejects the delete
    async fn delete(&self) -> Result<(), StoreError>;
}

/// Authentication surface consumed by HTTP layers and the UI
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Whether an authorization is stored (it may be expired)
    async fn is_authenticated(&self) -> bool;

    /// A currently valid access token, refreshing it if needed
    ///
    /// # Errors
    /// [`AuthError::NotAuthenticated`] when signed out, or
    /// [`AuthError::RefreshFailed`] when the refresh was rejected
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Whether this runtime can present an interactive sign-in
    fn can_sign_in(&self) -> bool;

    /// Run the interactive sign-in and persist the result
    ///
    /// # Errors
    /// [`AuthError::SignInUnavailable`] without a user agent, or
    /// [`AuthError::AuthorizationFailed`] when the flow fails
    async fn sign_in(&self) -> Result<(), AuthError>;

    /// Forget the current authorization
    ///
    /// # Errors
    /// Returns error if the store delete fails
    async fn sign_out(&self) -> Result<(), AuthError>;
}
