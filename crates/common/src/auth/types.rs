//! OAuth 2.0 types and structures
//!
//! Data carried between the OAuth client, the token store and the
//! authenticator: the persisted [`Authorization`], the provider
//! [`OAuthConfiguration`] and the RFC 6749 error body.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default bound on a single token-endpoint request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Access and refresh tokens of a signed-in session
///
/// This is both the token endpoint's JSON response and the record persisted
/// in the secure store. It is replaced as a whole on every sign-in or
/// refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Bearer token presented to the bike API
    pub access_token: String,

    /// Long-lived token used to obtain a new access token
    pub refresh_token: String,

    /// Absolute expiry of `access_token` (UTC)
    pub expires_at: DateTime<Utc>,
}

impl Authorization {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Whether the access token can still be presented right now
    ///
    /// At exactly `expires_at` the token is already considered expired.
    #[must_use]
    pub fn has_valid_access_token(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether the access token is valid at `instant`
    #[must_use]
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        instant < self.expires_at
    }

    /// Seconds until expiry (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Identity-provider configuration
///
/// Built once at startup and shared read-only by the OAuth client.
#[derive(Clone)]
pub struct OAuthConfiguration {
    pub client_id: String,
    pub client_secret: String,

    /// Login page presented in the user agent
    pub authorization_endpoint: String,

    /// Endpoint for code exchange and refresh
    pub token_endpoint: String,

    /// Redirect URI registered with the provider
    pub redirect_uri: String,

    /// URL scheme the user agent watches for the callback
    pub scheme: String,

    /// Scopes requested at sign-in
    pub scopes: Vec<String>,

    /// Bound on each token-endpoint request
    pub request_timeout: Duration,
}

impl OAuthConfiguration {
    /// Create a configuration with the default `openid profile` scopes
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        redirect_uri: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            redirect_uri: redirect_uri.into(),
            scheme: scheme.into(),
            scopes: vec!["openid".to_string(), "profile".to_string()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

impl fmt::Debug for OAuthConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfiguration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("redirect_uri", &self.redirect_uri)
            .field("scheme", &self.scheme)
            .field("scopes", &self.scopes)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
