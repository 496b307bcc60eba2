//! Mock implementations of the auth seams
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use url::Url;

use crate::auth::{
    Authorization, ExternalUserAgent, OAuthClientError, OAuthClientTrait, UserAgentError,
};
use crate::security::{KeychainError, SecretStore};

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory keychain
///
/// Clones share storage, so two clones behave like two processes of the
/// same application group reading one keychain service.
///
/// # Examples
///
/// ```
/// use bike_common::security::SecretStore;
/// use bike_common::testing::MockKeychainProvider;
///
/// let app = MockKeychainProvider::new("test.shared");
/// let widget = app.clone();
///
/// app.set_secret("key", "value").unwrap();
/// assert_eq!(widget.get_secret("key").unwrap(), "value");
/// ```
#[derive(Debug, Clone)]
pub struct MockKeychainProvider {
    storage: StorageData,
    service_name: String,
    fail_writes: Arc<AtomicBool>,
}

impl MockKeychainProvider {
    /// Create a new mock keychain provider with a service name for namespacing.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            service_name: service_name.into(),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Store raw bytes without validation (e.g. to simulate corruption)
    pub fn inject_raw(&self, key: &str, value: &str) {
        self.storage.lock().insert(key.to_string(), value.to_string());
    }

    /// Make every subsequent write and delete fail with `AccessFailed`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), KeychainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KeychainError::AccessFailed("mock keychain is read-only".to_string()));
        }
        Ok(())
    }
}

impl Default for MockKeychainProvider {
    fn default() -> Self {
        Self::new("bike-test")
    }
}

impl SecretStore for MockKeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.check_writable()?;
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        self.storage.lock().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.check_writable()?;
        self.storage.lock().remove(key);
        Ok(())
    }

    fn secret_exists(&self, key: &str) -> bool {
        self.storage.lock().contains_key(key)
    }
}

/// Scripted result of a mock OAuth call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Succeed with this authorization
    Authorized(Authorization),
    /// Fail as the token endpoint would
    Rejected { status: u16, message: String },
    /// Fail as a user cancellation
    Cancelled,
}

impl MockOutcome {
    fn into_result(self) -> Result<Authorization, OAuthClientError> {
        match self {
            Self::Authorized(authorization) => Ok(authorization),
            Self::Rejected { status, message } => {
                Err(OAuthClientError::TokenEndpoint { status, message })
            }
            Self::Cancelled => Err(OAuthClientError::Cancelled),
        }
    }
}

fn default_authorization(access_token: &str) -> Authorization {
    Authorization::new(access_token, "mock_refresh_token", Utc::now() + chrono::Duration::hours(1))
}

/// Mock OAuth client that simulates OAuth flows without network calls.
#[derive(Debug)]
pub struct MockOAuthClient {
    authorize_outcome: Mutex<MockOutcome>,
    refresh_outcome: Mutex<MockOutcome>,
    refresh_delay: Option<Duration>,
    authorize_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    refresh_tokens_used: Mutex<Vec<String>>,
}

impl MockOAuthClient {
    /// Create a new mock OAuth client whose calls all succeed.
    pub fn new() -> Self {
        Self {
            authorize_outcome: Mutex::new(MockOutcome::Authorized(default_authorization(
                "mock_access_token",
            ))),
            refresh_outcome: Mutex::new(MockOutcome::Authorized(default_authorization(
                "refreshed_access_token",
            ))),
            refresh_delay: None,
            authorize_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_tokens_used: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_authorize_outcome(self, outcome: MockOutcome) -> Self {
        *self.authorize_outcome.lock() = outcome;
        self
    }

    #[must_use]
    pub fn with_refresh_outcome(self, outcome: MockOutcome) -> Self {
        *self.refresh_outcome.lock() = outcome;
        self
    }

    /// Hold every refresh for `delay` before answering
    #[must_use]
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    /// Change the refresh outcome after construction
    pub fn set_refresh_outcome(&self, outcome: MockOutcome) {
        *self.refresh_outcome.lock() = outcome;
    }

    #[must_use]
    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens presented to `refresh`, in call order
    #[must_use]
    pub fn refresh_tokens_used(&self) -> Vec<String> {
        self.refresh_tokens_used.lock().clone()
    }
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn authorize(
        &self,
        user_agent: &dyn ExternalUserAgent,
    ) -> Result<Authorization, OAuthClientError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);

        let login = Url::parse("https://login.example.com/v1/login?client_id=mock")
            .map_err(|e| OAuthClientError::InvalidAuthorizationEndpoint(e.to_string()))?;
        user_agent.present(&login, "app").await?;

        let outcome = self.authorize_outcome.lock().clone();
        outcome.into_result()
    }

    async fn refresh(
        &self,
        authorization: &Authorization,
    ) -> Result<Authorization, OAuthClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_used.lock().push(authorization.refresh_token.clone());

        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.refresh_outcome.lock().clone();
        outcome.into_result()
    }
}

/// Scripted browser session
#[derive(Debug)]
pub struct MockUserAgent {
    outcome: Result<String, UserAgentError>,
    presented: Mutex<Vec<Url>>,
}

impl MockUserAgent {
    /// Complete every sign-in by redirecting to `callback`
    pub fn with_callback(callback: impl Into<String>) -> Self {
        Self { outcome: Ok(callback.into()), presented: Mutex::new(Vec::new()) }
    }

    /// Simulate the user closing the login page
    pub fn cancelling() -> Self {
        Self::failing(UserAgentError::Cancelled)
    }

    pub fn failing(error: UserAgentError) -> Self {
        Self { outcome: Err(error), presented: Mutex::new(Vec::new()) }
    }

    /// Login URLs presented so far
    #[must_use]
    pub fn presented_urls(&self) -> Vec<Url> {
        self.presented.lock().clone()
    }
}

#[async_trait]
impl ExternalUserAgent for MockUserAgent {
    async fn present(&self, url: &Url, _callback_scheme: &str) -> Result<Url, UserAgentError> {
        self.presented.lock().push(url.clone());

        match &self.outcome {
            Ok(callback) => Url::parse(callback).map_err(|e| UserAgentError::Failed(e.to_string())),
            Err(error) => Err(error.clone()),
        }
    }
}
