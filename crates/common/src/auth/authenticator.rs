//! Authenticator with single-flight token refresh
//!
//! Coordinates the OAuth client and the secure store:
//! - The store is the source of truth and is re-read on every token request,
//!   so a refresh or sign-out performed by another process is picked up.
//! - An expired token triggers at most one refresh at a time; every caller
//!   that arrives while it runs awaits the same outcome.
//! - A failed refresh is reported, never turned into an implicit sign-out.
//! - A refresh that completes after `sign_out` is discarded, not persisted.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};

use super::client::OAuthClientError;
use super::keychain::StoreError;
use super::traits::{Authenticator, AuthorizationStore, ExternalUserAgent, OAuthClientTrait};
use super::types::Authorization;

/// Error type for authenticator operations
///
/// `Clone` so that every caller joined on a refresh receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No authorization is stored, or the user signed out meanwhile
    #[error("not authenticated")]
    NotAuthenticated,

    /// The provider redirected back without a `code` parameter
    #[error("callback did not contain an authorization code")]
    MissingAuthorizationCode,

    /// Interactive sign-in did not produce an authorization
    #[error("authorization failed: {message}")]
    AuthorizationFailed {
        /// Human-readable cause
        message: String,
        /// Set when the user abandoned the login page
        cancelled: bool,
    },

    /// The token endpoint rejected or could not serve the refresh
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// No [`ExternalUserAgent`] is attached to this controller
    #[error("sign-in is not available on this device")]
    SignInUnavailable,

    /// The secure store rejected a write or delete
    #[error("secure store error: {0}")]
    Store(String),
}

impl AuthError {
    /// Whether the user abandoned the sign-in
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::AuthorizationFailed { cancelled: true, .. })
    }
}

impl From<OAuthClientError> for AuthError {
    fn from(err: OAuthClientError) -> Self {
        match err {
            OAuthClientError::MissingAuthorizationCode => Self::MissingAuthorizationCode,
            other => Self::AuthorizationFailed {
                cancelled: other.is_cancellation(),
                message: other.to_string(),
            },
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

type RefreshResult = Result<Authorization, AuthError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// Slot holding the refresh currently being awaited
#[derive(Default)]
struct InFlight {
    next_id: u64,
    running: Option<(u64, SharedRefresh)>,
}

impl InFlight {
    /// Clear the slot if it still holds refresh `id`
    fn finish(&mut self, id: u64) {
        if self.running.as_ref().is_some_and(|(running, _)| *running == id) {
            self.running = None;
        }
    }
}

/// Production [`Authenticator`]
///
/// Manages the full token lifecycle:
/// 1. Interactive sign-in through an optional [`ExternalUserAgent`]
/// 2. Persistence through an [`AuthorizationStore`]
/// 3. Single-flight refresh of expired access tokens
/// 4. Sign-out
pub struct AuthenticationController<C, S> {
    oauth_client: Arc<C>,
    store: Arc<S>,
    user_agent: Option<Arc<dyn ExternalUserAgent>>,
    current: Arc<RwLock<Option<Authorization>>>,
    in_flight: Arc<Mutex<InFlight>>,
    /// Sign-out epoch; bumped by every `sign_out`
    epoch: Arc<AsyncMutex<u64>>,
}

impl<C, S> AuthenticationController<C, S>
where
    C: OAuthClientTrait + 'static,
    S: AuthorizationStore + 'static,
{
    /// Create a controller without sign-in capability
    ///
    /// Suitable for runtimes that only consume tokens obtained elsewhere
    /// (watch, widgets). Attach a user agent with [`Self::with_user_agent`].
    #[must_use]
    pub fn new(oauth_client: Arc<C>, store: Arc<S>) -> Self {
        Self {
            oauth_client,
            store,
            user_agent: None,
            current: Arc::new(RwLock::new(None)),
            in_flight: Arc::new(Mutex::new(InFlight::default())),
            epoch: Arc::new(AsyncMutex::new(0)),
        }
    }

    /// Enable interactive sign-in through `user_agent`
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Arc<dyn ExternalUserAgent>) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Last authorization seen by this controller (without refresh)
    pub async fn current_authorization(&self) -> Option<Authorization> {
        self.current.read().await.clone()
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn reload(&self) -> Option<Authorization> {
        let stored = self.store.read().await;
        *self.current.write().await = stored.clone();
        stored
    }

    /// Join the running refresh or start one
    fn refresh_single_flight(&self) -> SharedRefresh {
        let mut in_flight = self.in_flight.lock();
        if let Some((_, existing)) = in_flight.running.as_ref() {
            // A settled handle is never reused; the next expiry gets a new attempt.
            if existing.peek().is_none() {
                debug!("Joining in-flight token refresh");
                return existing.clone();
            }
            in_flight.running = None;
        }

        let id = in_flight.next_id;
        in_flight.next_id = id.wrapping_add(1);

        let refresh = run_refresh(
            Arc::clone(&self.oauth_client),
            Arc::clone(&self.store),
            Arc::clone(&self.current),
            Arc::clone(&self.epoch),
        );

        // Spawned so callers giving up on the wait do not cancel it. The task
        // clears its own slot even when nobody awaits the outcome.
        let slot = Arc::clone(&self.in_flight);
        let task = tokio::spawn(async move {
            let result = refresh.await;
            slot.lock().finish(id);
            result
        });

        let slot = Arc::clone(&self.in_flight);
        let shared = async move {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(AuthError::RefreshFailed(format!("refresh task aborted: {e}"))),
            };
            slot.lock().finish(id);
            result
        }
        .boxed()
        .shared();

        in_flight.running = Some((id, shared.clone()));
        shared
    }
}

async fn run_refresh<C, S>(
    oauth_client: Arc<C>,
    store: Arc<S>,
    current: Arc<RwLock<Option<Authorization>>>,
    epoch: Arc<AsyncMutex<u64>>,
) -> RefreshResult
where
    C: OAuthClientTrait,
    S: AuthorizationStore,
{
    let started = *epoch.lock().await;

    // Another process may have refreshed or signed out since the caller read.
    let Some(latest) = store.read().await else {
        *current.write().await = None;
        return Err(AuthError::NotAuthenticated);
    };

    if latest.has_valid_access_token() {
        debug!(expires_at = %latest.expires_at, "Adopting authorization refreshed elsewhere");
        *current.write().await = Some(latest.clone());
        return Ok(latest);
    }

    let refreshed = oauth_client.refresh(&latest).await.map_err(|e| {
        warn!(error = %e, "Token refresh failed");
        AuthError::RefreshFailed(e.to_string())
    })?;

    // Held until `current` is updated so a concurrent sign-out lands after us.
    let guard = epoch.lock().await;
    if *guard != started {
        info!("Discarding token refresh completed after sign-out");
        return Err(AuthError::NotAuthenticated);
    }

    store.write(&refreshed).await?;
    *current.write().await = Some(refreshed.clone());
    drop(guard);

    info!(expires_at = %refreshed.expires_at, "Access token refreshed");
    Ok(refreshed)
}

#[async_trait]
impl<C, S> Authenticator for AuthenticationController<C, S>
where
    C: OAuthClientTrait + 'static,
    S: AuthorizationStore + 'static,
{
    async fn is_authenticated(&self) -> bool {
        self.reload().await.is_some()
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        let authorization = self.reload().await.ok_or(AuthError::NotAuthenticated)?;

        if authorization.has_valid_access_token() {
            return Ok(authorization.access_token);
        }

        debug!(expires_at = %authorization.expires_at, "Access token expired");
        let refreshed = self.refresh_single_flight().await?;
        Ok(refreshed.access_token)
    }

    fn can_sign_in(&self) -> bool {
        self.user_agent.is_some()
    }

    async fn sign_in(&self) -> Result<(), AuthError> {
        let user_agent = self.user_agent.as_ref().ok_or(AuthError::SignInUnavailable)?;

        let authorization = self.oauth_client.authorize(user_agent.as_ref()).await?;
        self.store.write(&authorization).await?;
        *self.current.write().await = Some(authorization);

        info!("Signed in");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut epoch = self.epoch.lock().await;
        *epoch = epoch.wrapping_add(1);

        let abandoned = self.in_flight.lock().running.take().is_some();
        if abandoned {
            debug!("Abandoning in-flight token refresh");
        }

        *self.current.write().await = None;
        self.store.delete().await?;

        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::authenticator.
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;
    use crate::auth::keychain::SecureTokenStore;
    use crate::testing::{MockKeychainProvider, MockOAuthClient, MockOutcome, MockUserAgent};

    type TestController = AuthenticationController<MockOAuthClient, SecureTokenStore<MockKeychainProvider>>;

    fn expired() -> Authorization {
        Authorization::new("stale", "refresh-1", Utc::now() - ChronoDuration::minutes(5))
    }

    fn fresh(token: &str) -> Authorization {
        Authorization::new(token, "refresh-2", Utc::now() + ChronoDuration::hours(1))
    }

    fn controller(client: MockOAuthClient) -> (TestController, Arc<MockOAuthClient>) {
        let client = Arc::new(client);
        let store = Arc::new(SecureTokenStore::new(MockKeychainProvider::new("test.shared")));
        (AuthenticationController::new(Arc::clone(&client), store), client)
    }

    /// Validates `access_token` behavior for the valid stored token scenario.
    ///
    /// Assertions:
    /// - Confirms the stored token is returned.
    /// - Ensures no refresh is issued.
    #[tokio::test]
    async fn valid_token_returned_without_refresh() {
        let (controller, client) = controller(MockOAuthClient::new());
        controller.store().write(&fresh("valid")).await.unwrap();

        assert_eq!(controller.access_token().await.unwrap(), "valid");
        assert_eq!(client.refresh_calls(), 0);
    }

    /// Validates `access_token` behavior for the expired token scenario.
    ///
    /// Assertions:
    /// - Confirms the refreshed token is returned and persisted.
    /// - Confirms the stored refresh token was used.
    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let (controller, client) = controller(
            MockOAuthClient::new().with_refresh_outcome(MockOutcome::Authorized(fresh("renewed"))),
        );
        controller.store().write(&expired()).await.unwrap();

        assert_eq!(controller.access_token().await.unwrap(), "renewed");
        assert_eq!(client.refresh_calls(), 1);
        assert_eq!(client.refresh_tokens_used(), vec!["refresh-1".to_string()]);
        assert_eq!(controller.store().read().await.unwrap().access_token, "renewed");
        assert_eq!(controller.current_authorization().await.unwrap().access_token, "renewed");
    }

    /// Validates `access_token` behavior for the concurrent callers scenario.
    ///
    /// Assertions:
    /// - Confirms exactly one refresh reaches the OAuth client.
    /// - Confirms every caller receives the same token.
    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let (controller, client) = controller(
            MockOAuthClient::new()
                .with_refresh_outcome(MockOutcome::Authorized(fresh("shared")))
                .with_refresh_delay(Duration::from_millis(50)),
        );
        controller.store().write(&expired()).await.unwrap();

        let results = futures::future::join_all((0..8).map(|_| controller.access_token())).await;

        assert_eq!(client.refresh_calls(), 1);
        assert!(results.iter().all(|r| r.as_deref() == Ok("shared")));
    }

    /// Validates `access_token` behavior for the abandoned caller scenario.
    ///
    /// Assertions:
    /// - Confirms a refresh whose only caller gave up is not handed to the
    ///   next caller.
    /// - Confirms the next call reaches the OAuth client again.
    #[tokio::test]
    async fn abandoned_refresh_is_not_reused() {
        let (controller, client) = controller(
            MockOAuthClient::new()
                .with_refresh_outcome(MockOutcome::Rejected { status: 503, message: "down".into() })
                .with_refresh_delay(Duration::from_millis(50)),
        );
        controller.store().write(&expired()).await.unwrap();

        let gave_up = tokio::time::timeout(Duration::from_millis(5), controller.access_token()).await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        client.set_refresh_outcome(MockOutcome::Authorized(fresh("recovered")));

        assert_eq!(controller.access_token().await.as_deref(), Ok("recovered"));
        assert_eq!(client.refresh_calls(), 2);
    }

    /// Validates `access_token` behavior for the repeated expiry scenario.
    ///
    /// Assertions:
    /// - Confirms each expiry after a settled refresh triggers its own refresh.
    #[tokio::test]
    async fn second_expiry_starts_new_refresh() {
        let (controller, client) = controller(
            MockOAuthClient::new().with_refresh_outcome(MockOutcome::Authorized(fresh("first"))),
        );
        controller.store().write(&expired()).await.unwrap();
        assert_eq!(controller.access_token().await.as_deref(), Ok("first"));

        controller.store().write(&expired()).await.unwrap();
        client.set_refresh_outcome(MockOutcome::Authorized(fresh("second")));

        assert_eq!(controller.access_token().await.as_deref(), Ok("second"));
        assert_eq!(client.refresh_calls(), 2);
    }

    /// Validates `sign_out` behavior while a refresh is running.
    ///
    /// Assertions:
    /// - Ensures the waiting caller gets `NotAuthenticated`.
    /// - Ensures the refreshed token is not persisted after sign-out.
    #[tokio::test]
    async fn sign_out_during_refresh_stays_signed_out() {
        let (controller, client) = controller(
            MockOAuthClient::new()
                .with_refresh_outcome(MockOutcome::Authorized(fresh("refreshed")))
                .with_refresh_delay(Duration::from_millis(50)),
        );
        controller.store().write(&expired()).await.unwrap();

        let (token, signed_out) = tokio::join!(controller.access_token(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.sign_out().await
        });

        assert_eq!(signed_out, Ok(()));
        assert_eq!(token, Err(AuthError::NotAuthenticated));
        assert_eq!(client.refresh_calls(), 1);

        // Let any straggling task finish before checking persistence.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!controller.is_authenticated().await);
        assert!(controller.store().read().await.is_none());
        assert!(controller.current_authorization().await.is_none());
    }

    /// Validates `sign_out` behavior for a refresh abandoned by every caller.
    ///
    /// Assertions:
    /// - Ensures the background refresh does not sign the user back in.
    #[tokio::test]
    async fn sign_out_discards_unawaited_refresh() {
        let (controller, _) = controller(
            MockOAuthClient::new()
                .with_refresh_outcome(MockOutcome::Authorized(fresh("refreshed")))
                .with_refresh_delay(Duration::from_millis(50)),
        );
        controller.store().write(&expired()).await.unwrap();

        let _ = tokio::time::timeout(Duration::from_millis(5), controller.access_token()).await;
        controller.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!controller.is_authenticated().await);
        assert_eq!(controller.access_token().await, Err(AuthError::NotAuthenticated));
    }

    /// Validates `access_token` behavior for the rejected refresh scenario.
    ///
    /// Assertions:
    /// - Ensures every concurrent caller receives the same `RefreshFailed`.
    /// - Ensures the user stays authenticated.
    /// - Confirms the next call starts a new refresh attempt.
    #[tokio::test]
    async fn failed_refresh_is_shared_and_not_sticky() {
        let (controller, client) = controller(
            MockOAuthClient::new()
                .with_refresh_outcome(MockOutcome::Rejected {
                    status: 400,
                    message: "invalid_grant".into(),
                })
                .with_refresh_delay(Duration::from_millis(20)),
        );
        controller.store().write(&expired()).await.unwrap();

        let (first, second) = tokio::join!(controller.access_token(), controller.access_token());
        assert!(matches!(first, Err(AuthError::RefreshFailed(_))));
        assert_eq!(first, second);
        assert_eq!(client.refresh_calls(), 1);
        assert!(controller.is_authenticated().await);

        let _ = controller.access_token().await;
        assert_eq!(client.refresh_calls(), 2);
    }

    #[tokio::test]
    async fn signed_out_store_is_not_authenticated() {
        let (controller, client) = controller(MockOAuthClient::new());

        assert!(!controller.is_authenticated().await);
        assert_eq!(controller.access_token().await, Err(AuthError::NotAuthenticated));
        assert_eq!(client.refresh_calls(), 0);
    }

    /// Validates `sign_in` behavior for the missing user agent scenario.
    ///
    /// Assertions:
    /// - Ensures `can_sign_in` is false.
    /// - Ensures `sign_in` fails with `SignInUnavailable`.
    #[tokio::test]
    async fn sign_in_requires_user_agent() {
        let (controller, client) = controller(MockOAuthClient::new());

        assert!(!controller.can_sign_in());
        assert_eq!(controller.sign_in().await, Err(AuthError::SignInUnavailable));
        assert_eq!(client.authorize_calls(), 0);
    }

    /// Validates `sign_in` behavior for the user cancellation scenario.
    ///
    /// Assertions:
    /// - Ensures the error is flagged as a cancellation.
    /// - Ensures nothing is persisted.
    #[tokio::test]
    async fn cancelled_sign_in_persists_nothing() {
        let (controller, _) = controller(
            MockOAuthClient::new().with_authorize_outcome(MockOutcome::Cancelled),
        );
        let controller = controller.with_user_agent(Arc::new(MockUserAgent::cancelling()));

        let error = controller.sign_in().await.unwrap_err();

        assert!(error.is_cancellation());
        assert!(controller.store().read().await.is_none());
        assert!(!controller.is_authenticated().await);
    }

    #[tokio::test]
    async fn sign_in_then_sign_out() {
        let (controller, _) = controller(MockOAuthClient::new());
        let controller = controller
            .with_user_agent(Arc::new(MockUserAgent::with_callback("app://cb?code=1")));

        controller.sign_in().await.unwrap();
        assert!(controller.is_authenticated().await);

        controller.sign_out().await.unwrap();
        controller.sign_out().await.unwrap();
        assert!(!controller.is_authenticated().await);
        assert!(controller.current_authorization().await.is_none());
    }

    #[test]
    fn oauth_errors_map_to_auth_errors() {
        assert_eq!(
            AuthError::from(OAuthClientError::MissingAuthorizationCode),
            AuthError::MissingAuthorizationCode
        );
        assert!(AuthError::from(OAuthClientError::Cancelled).is_cancellation());
        assert!(!AuthError::from(OAuthClientError::Parse("x".into())).is_cancellation());
    }
}
