//! OAuth 2.0 client implementation with PKCE support
//!
//! Handles the browser-based authorization flow against the bike identity
//! provider:
//! - PKCE challenge generation
//! - Authorization URL building
//! - Authorization code exchange (HTTP Basic client authentication)
//! - Token refresh

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::pkce::PkceChallenge;
use super::traits::{ExternalUserAgent, OAuthClientTrait, UserAgentError};
use super::types::{Authorization, OAuthConfiguration, TokenErrorResponse};

/// Error type for OAuth client operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// Transport failure or HTTP client construction failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Token endpoint answered with a non-success status
    #[error("token endpoint returned {status}: {message}")]
    TokenEndpoint {
        /// HTTP status code
        status: u16,
        /// Provider error description, or the raw body
        message: String,
    },

    /// Token response body did not match the expected shape
    #[error("failed to parse token response: {0}")]
    Parse(String),

    /// Configured login URL does not parse
    #[error("invalid authorization endpoint: {0}")]
    InvalidAuthorizationEndpoint(String),

    /// Callback URL carried neither `code` nor `error`
    #[error("callback did not contain an authorization code")]
    MissingAuthorizationCode,

    /// Provider redirected back with an `error` parameter
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Stored authorization has an empty refresh token
    #[error("no refresh token available")]
    NoRefreshToken,

    /// User dismissed the login page
    #[error("user cancelled the sign-in")]
    Cancelled,

    /// Browser session failed for a reason other than cancellation
    #[error("user agent failed: {0}")]
    UserAgent(String),
}

impl OAuthClientError {
    /// Whether the failure is the user abandoning the login page
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<UserAgentError> for OAuthClientError {
    fn from(err: UserAgentError) -> Self {
        match err {
            UserAgentError::Cancelled => Self::Cancelled,
            other => Self::UserAgent(other.to_string()),
        }
    }
}

/// Progress of the most recent authorization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPhase {
    /// No authorization attempted yet
    Idle,
    /// Login page presented, waiting for the callback
    AwaitingUserInteraction,
    /// Callback received, code exchange in progress
    ExchangingCode,
    /// Last attempt produced an authorization
    Authorized,
    /// Last attempt failed or was cancelled
    Failed,
}

/// OAuth 2.0 client with PKCE support
///
/// Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE). Each `authorize`
/// call uses a fresh PKCE pair; `refresh` is stateless.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: Arc<OAuthConfiguration>,
    http: Client,
    phase: Arc<Mutex<AuthorizationPhase>>,
}

impl OAuthClient {
    /// Create a new OAuth client with the given configuration
    ///
    /// Token-endpoint requests are bounded by `config.request_timeout`.
    ///
    /// # Examples
    /// ```
    /// use bike_common::auth::{OAuthClient, OAuthConfiguration};
    ///
    /// let config = OAuthConfiguration::new(
    ///     "client_id",
    ///     "client_secret",
    ///     "https://login.example.com/v1/login",
    ///     "https://api.example.com/oauth",
    ///     "app.example://callback",
    ///     "app.example",
    /// );
    /// let client = OAuthClient::new(config).unwrap();
    /// assert_eq!(client.config().client_id, "client_id");
    /// ```
    ///
    /// # Errors
    /// Returns [`OAuthClientError::Http`] if the HTTP client cannot be built
    pub fn new(config: OAuthConfiguration) -> Result<Self, OAuthClientError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self::with_http_client(config, http))
    }

    /// Create a client that sends token requests through `http`
    #[must_use]
    pub fn with_http_client(config: OAuthConfiguration, http: Client) -> Self {
        Self {
            config: Arc::new(config),
            http,
            phase: Arc::new(Mutex::new(AuthorizationPhase::Idle)),
        }
    }

    /// Build the login page URL for `pkce`
    ///
    /// # Errors
    /// Returns [`OAuthClientError::InvalidAuthorizationEndpoint`] if the
    /// configured endpoint is not a valid URL
    pub fn authorization_url(&self, pkce: &PkceChallenge) -> Result<Url, OAuthClientError> {
        let mut url = Url::parse(&self.config.authorization_endpoint)
            .map_err(|e| OAuthClientError::InvalidAuthorizationEndpoint(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scope_string())
            .append_pair("code_challenge_method", pkce.challenge_method())
            .append_pair("code_challenge", &pkce.code_challenge);

        Ok(url)
    }

    /// Run the full interactive flow through `user_agent`
    ///
    /// # Errors
    /// Returns [`OAuthClientError::Cancelled`] when the user abandons the
    /// login page, or the first failure of URL building, callback parsing or
    /// code exchange.
    pub async fn authorize(
        &self,
        user_agent: &dyn ExternalUserAgent,
    ) -> Result<Authorization, OAuthClientError> {
        let result = self.run_authorization(user_agent).await;

        match &result {
            Ok(authorization) => {
                self.set_phase(AuthorizationPhase::Authorized);
                info!(expires_at = %authorization.expires_at, "Authorization completed");
            }
            Err(e) => {
                self.set_phase(AuthorizationPhase::Failed);
                warn!(error = %e, cancelled = e.is_cancellation(), "Authorization failed");
            }
        }

        result
    }

    async fn run_authorization(
        &self,
        user_agent: &dyn ExternalUserAgent,
    ) -> Result<Authorization, OAuthClientError> {
        let pkce = PkceChallenge::generate();
        let url = self.authorization_url(&pkce)?;

        self.set_phase(AuthorizationPhase::AwaitingUserInteraction);
        let callback = user_agent.present(&url, &self.config.scheme).await?;
        let code = authorization_code_from_callback(&callback)?;

        self.set_phase(AuthorizationPhase::ExchangingCode);
        self.exchange_code(&code, &pkce.code_verifier).await
    }

    /// Exchange authorization code for tokens
    ///
    /// The client authenticates with HTTP Basic credentials; the verifier
    /// proves possession of the challenge sent with the login request.
    ///
    /// # Errors
    /// Returns error if the request fails, the endpoint rejects the code, or
    /// the response cannot be decoded
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Authorization, OAuthClientError> {
        debug!(endpoint = %self.config.token_endpoint, "Exchanging authorization code");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(&self.config.token_endpoint)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&params)
            .send()
            .await?;

        decode_token_response(response).await
    }

    /// Refresh access token using refresh token
    ///
    /// No retry happens here; callers decide how to react to a failure.
    ///
    /// # Errors
    /// Returns error if:
    /// - No refresh token is present
    /// - The request fails
    /// - The token is invalid or revoked
    pub async fn refresh(
        &self,
        authorization: &Authorization,
    ) -> Result<Authorization, OAuthClientError> {
        if authorization.refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        debug!(endpoint = %self.config.token_endpoint, "Refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", authorization.refresh_token.as_str()),
        ];

        let response = self.http.post(&self.config.token_endpoint).form(&params).send().await?;

        decode_token_response(response).await
    }

    /// Phase of the most recent `authorize` call
    #[must_use]
    pub fn phase(&self) -> AuthorizationPhase {
        *self.phase.lock()
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfiguration {
        &self.config
    }

    fn set_phase(&self, phase: AuthorizationPhase) {
        debug!(?phase, "Authorization phase changed");
        *self.phase.lock() = phase;
    }
}

/// Extract the authorization code from the provider's redirect
///
/// # Errors
/// [`OAuthClientError::AuthorizationDenied`] when the redirect carries an
/// `error` parameter, [`OAuthClientError::MissingAuthorizationCode`] when it
/// carries no `code`.
pub fn authorization_code_from_callback(callback: &Url) -> Result<String, OAuthClientError> {
    let mut code = None;
    let mut error = None;
    let mut description = None;

    for (name, value) in callback.query_pairs() {
        match name.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        let denial = TokenErrorResponse { error, error_description: description };
        return Err(OAuthClientError::AuthorizationDenied(denial.to_string()));
    }

    code.filter(|c| !c.is_empty()).ok_or(OAuthClientError::MissingAuthorizationCode)
}

async fn decode_token_response(response: Response) -> Result<Authorization, OAuthClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<TokenErrorResponse>(&body)
            .map(|e| e.to_string())
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
        return Err(OAuthClientError::TokenEndpoint { status: status.as_u16(), message });
    }

    serde_json::from_str(&body).map_err(|e| OAuthClientError::Parse(e.to_string()))
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    async fn authorize(
        &self,
        user_agent: &dyn ExternalUserAgent,
    ) -> Result<Authorization, OAuthClientError> {
        Self::authorize(self, user_agent).await
    }

    async fn refresh(
        &self,
        authorization: &Authorization,
    ) -> Result<Authorization, OAuthClientError> {
        Self::refresh(self, authorization).await
    }
}
