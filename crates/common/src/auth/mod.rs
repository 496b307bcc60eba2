//! OAuth 2.0 + PKCE authentication for the bike API
//!
//! Signs the user in through the identity provider's login page, keeps the
//! resulting tokens in a keychain shared by every process of the app, and
//! hands out valid access tokens to HTTP clients.
//!
//! # Features
//!
//! - **PKCE Flow**: RFC 7636 `S256` code exchange, fresh pair per sign-in
//! - **Shared Storage**: one JSON record in the shared keychain; the store is
//!   re-read on every token request
//! - **Single-Flight Refresh**: concurrent callers with an expired token wait
//!   on one refresh and all get its result
//! - **Request Interception**: bearer header on every attempt, bounded
//!   fixed-delay retries
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  AuthenticationInterceptor   │  Bearer header + retry decisions
//! └──────────────┬───────────────┘
//!                │ dyn Authenticator
//! ┌──────────────▼───────────────┐
//! │  AuthenticationController    │  sign_in / sign_out / access_token
//! └──────┬───────────────┬───────┘
//!        │               │
//!        ├──► OAuthClient          (authorize + refresh over HTTP)
//!        │         ├──► ExternalUserAgent  (login page in a browser)
//!        │         └──► PKCE utilities
//!        │
//!        └──► SecureTokenStore     (bike.authorization record)
//!                  └──► SecretStore        (platform keychain)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bike_common::auth::{
//!     AuthenticationController, Authenticator, OAuthClient, OAuthConfiguration,
//!     SecureTokenStore,
//! };
//! use bike_common::security::KeychainProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfiguration::new(
//!     "client_id",
//!     "client_secret",
//!     "https://login.conneq.tech/v1/login",
//!     "https://api.ids.conneq.tech/oauth",
//!     "tech.conneq.decathlon://decathlon.app.ids.conneq.tech",
//!     "tech.conneq.decathlon",
//! );
//!
//! let store = SecureTokenStore::new(KeychainProvider::new("tech.conneq.decathlon.shared"));
//! let authenticator =
//!     AuthenticationController::new(Arc::new(OAuthClient::new(config)?), Arc::new(store));
//!
//! if authenticator.is_authenticated().await {
//!     let token = authenticator.access_token().await?;
//!     println!("token has {} characters", token.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `Authorization`, `OAuthConfiguration`, token error body
//! - **[`pkce`]**: PKCE verifier and challenge generation
//! - **[`client`]**: OAuth HTTP client for authorization and token exchange
//! - **[`authenticator`]**: Token lifecycle with single-flight refresh
//! - **[`interceptor`]**: Bearer injection and retry decisions
//! - **[`traits`]**: Seams for the provider, browser, store and consumers

pub mod authenticator;
pub mod client;
pub mod interceptor;
mod keychain;
pub mod pkce;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use authenticator::{AuthError, AuthenticationController};
pub use client::{
    authorization_code_from_callback, AuthorizationPhase, OAuthClient, OAuthClientError,
};
pub use interceptor::{AuthenticationInterceptor, RequestFailure, RequestInterceptor};
pub use keychain::{SecureTokenStore, StoreError, AUTHORIZATION_KEY};
pub use pkce::{generate_code_challenge, generate_code_verifier, PkceChallenge, PkceError};
pub use traits::{
    Authenticator, AuthorizationStore, ExternalUserAgent, OAuthClientTrait, UserAgentError,
};
pub use types::{Authorization, OAuthConfiguration, TokenErrorResponse};
