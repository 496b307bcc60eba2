//! Integration tests for auth module
//!
//! Runs the real OAuth client against a wiremock token endpoint, with the
//! in-memory keychain standing in for the shared platform keychain.

use std::sync::Arc;
use std::time::Duration;

use bike_common::auth::{
    AuthError, AuthenticationController, AuthenticationInterceptor, Authenticator,
    Authorization, AuthorizationStore, OAuthClient, OAuthConfiguration, RequestInterceptor,
    SecureTokenStore, AUTHORIZATION_KEY,
};
use bike_common::testing::{MockKeychainProvider, MockUserAgent};
use chrono::{Duration as ChronoDuration, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Controller = AuthenticationController<OAuthClient, SecureTokenStore<MockKeychainProvider>>;

const CALLBACK: &str = "tech.conneq.decathlon://decathlon.app.ids.conneq.tech";

struct Harness {
    server: MockServer,
    keychain: MockKeychainProvider,
    controller: Arc<Controller>,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let keychain = MockKeychainProvider::new("tech.conneq.decathlon.shared");
        let controller = Arc::new(Self::controller_for(&server, keychain.clone()));
        Self { server, keychain, controller }
    }

    /// A second controller sharing the keychain, as another process would
    fn controller_for(server: &MockServer, keychain: MockKeychainProvider) -> Controller {
        let config = OAuthConfiguration::new(
            "client",
            "secret",
            "https://login.example.com/v1/login",
            format!("{}/oauth", server.uri()),
            CALLBACK,
            "tech.conneq.decathlon",
        )
        .with_request_timeout(Duration::from_secs(5));

        AuthenticationController::new(
            Arc::new(OAuthClient::new(config).unwrap()),
            Arc::new(SecureTokenStore::new(keychain)),
        )
    }

    async fn store(&self, authorization: &Authorization) {
        SecureTokenStore::new(self.keychain.clone()).write(authorization).await.unwrap();
    }

    async fn stored(&self) -> Option<Authorization> {
        SecureTokenStore::new(self.keychain.clone()).read().await
    }
}

fn expired() -> Authorization {
    Authorization::new("expired_access", "valid_refresh", Utc::now() - ChronoDuration::minutes(1))
}

fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": "rotated_refresh",
        "expires_at": (Utc::now() + ChronoDuration::hours(1)).to_rfc3339(),
    }))
}

/// Validates the expired token refresh flow end to end.
///
/// # Test Steps
/// 1. Store an expired authorization with a valid refresh token
/// 2. Request an access token
/// 3. Verify exactly one refresh POST, the new token returned and persisted
#[tokio::test(flavor = "multi_thread")]
async fn test_expired_token_refreshed_and_persisted() {
    let harness = Harness::start().await;
    harness.store(&expired()).await;

    Mock::given(method("POST"))
        .and(path("/oauth"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=valid_refresh"))
        .respond_with(token_response("fresh_access"))
        .expect(1)
        .mount(&harness.server)
        .await;

    let token = harness.controller.access_token().await.unwrap();

    assert_eq!(token, "fresh_access");
    let stored = harness.stored().await.unwrap();
    assert_eq!(stored.access_token, "fresh_access");
    assert_eq!(stored.refresh_token, "rotated_refresh");
}

/// Validates single-flight refresh under concurrency.
///
/// # Test Steps
/// 1. Store an expired authorization
/// 2. Issue 16 concurrent `access_token` calls from separate tasks
/// 3. Verify the token endpoint saw exactly one request and every caller got
///    the same token
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_token_refreshes_once() {
    let harness = Harness::start().await;
    harness.store(&expired()).await;

    Mock::given(method("POST"))
        .and(path("/oauth"))
        .respond_with(token_response("shared_access").set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&harness.server)
        .await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let controller = Arc::clone(&harness.controller);
            tokio::spawn(async move { controller.access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared_access");
    }
}

/// Validates that a rejected refresh reaches every waiting caller.
///
/// # Test Steps
/// 1. Token endpoint answers 400 `invalid_grant`
/// 2. Issue concurrent `access_token` calls
/// 3. Verify one request, identical `RefreshFailed` errors, and the user is
///    still authenticated
#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_rejection_shared_and_session_kept() {
    let harness = Harness::start().await;
    harness.store(&expired()).await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "invalid_grant"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let (a, b, c) = tokio::join!(
        harness.controller.access_token(),
        harness.controller.access_token(),
        harness.controller.access_token()
    );

    assert!(matches!(a, Err(AuthError::RefreshFailed(ref message)) if message.contains("invalid_grant")));
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(harness.controller.is_authenticated().await);
    assert!(harness.stored().await.is_some());
}

/// Validates sign-out semantics.
///
/// # Test Steps
/// 1. Store a valid authorization and sign out
/// 2. Verify `is_authenticated` is false and `access_token` fails with
///    `NotAuthenticated` without any network traffic
#[tokio::test(flavor = "multi_thread")]
async fn test_sign_out_clears_session_without_network() {
    let harness = Harness::start().await;
    harness
        .store(&Authorization::new("a", "r", Utc::now() + ChronoDuration::hours(1)))
        .await;

    Mock::given(method("POST")).respond_with(token_response("x")).expect(0).mount(&harness.server).await;

    harness.controller.sign_out().await.unwrap();

    assert!(!harness.controller.is_authenticated().await);
    assert_eq!(harness.controller.access_token().await, Err(AuthError::NotAuthenticated));
    assert!(!bike_common::SecretStore::secret_exists(&harness.keychain, AUTHORIZATION_KEY));
}

/// Validates interactive sign-in on an empty store.
///
/// # Test Steps
/// 1. Start with an empty keychain
/// 2. Sign in through a user agent returning a code
/// 3. Verify the code exchange happened and the store is populated
#[tokio::test(flavor = "multi_thread")]
async fn test_sign_in_populates_store() {
    let harness = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(token_response("signed_in_access"))
        .expect(1)
        .mount(&harness.server)
        .await;

    let user_agent = Arc::new(MockUserAgent::with_callback(format!("{CALLBACK}?code=the-code")));
    let controller = Harness::controller_for(&harness.server, harness.keychain.clone())
        .with_user_agent(user_agent.clone());

    assert!(!controller.is_authenticated().await);
    assert!(controller.can_sign_in());

    controller.sign_in().await.unwrap();

    assert!(controller.is_authenticated().await);
    assert_eq!(harness.stored().await.unwrap().access_token, "signed_in_access");
    assert_eq!(controller.access_token().await.unwrap(), "signed_in_access");
    assert_eq!(user_agent.presented_urls().len(), 1);
}

/// Validates that a cancelled sign-in leaves no trace.
#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_sign_in_persists_nothing() {
    let harness = Harness::start().await;
    let controller = Harness::controller_for(&harness.server, harness.keychain.clone())
        .with_user_agent(Arc::new(MockUserAgent::cancelling()));

    let error = controller.sign_in().await.unwrap_err();

    assert!(error.is_cancellation());
    assert!(harness.stored().await.is_none());
    assert!(harness.server.received_requests().await.unwrap().is_empty());
}

/// Validates cross-process refresh adoption.
///
/// # Test Steps
/// 1. Process A reads an expired authorization
/// 2. Process B (another controller on the same keychain) refreshes
/// 3. Process A's next `access_token` adopts B's token without a request
#[tokio::test(flavor = "multi_thread")]
async fn test_token_refreshed_by_other_process_is_adopted() {
    let harness = Harness::start().await;
    harness.store(&expired()).await;

    Mock::given(method("POST"))
        .respond_with(token_response("from_widget"))
        .expect(1)
        .mount(&harness.server)
        .await;

    assert!(harness.controller.is_authenticated().await);

    let widget = Harness::controller_for(&harness.server, harness.keychain.clone());
    assert_eq!(widget.access_token().await.unwrap(), "from_widget");

    assert_eq!(harness.controller.access_token().await.unwrap(), "from_widget");
}

/// Validates that corrupt keychain data reads as signed out.
#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_store_reads_as_signed_out() {
    let harness = Harness::start().await;
    harness.keychain.inject_raw(AUTHORIZATION_KEY, "{\"access_token\": 42");

    assert!(harness.stored().await.is_none());
    assert!(!harness.controller.is_authenticated().await);
    assert_eq!(harness.controller.access_token().await, Err(AuthError::NotAuthenticated));
}

/// Validates the interceptor over a live controller.
///
/// # Test Steps
/// 1. Store a valid authorization
/// 2. Adapt a request through the interceptor
/// 3. Verify the bearer header and that no refresh was issued
#[tokio::test(flavor = "multi_thread")]
async fn test_interceptor_adds_bearer_without_refresh() {
    let harness = Harness::start().await;
    harness
        .store(&Authorization::new("valid_access", "r", Utc::now() + ChronoDuration::hours(1)))
        .await;

    Mock::given(method("POST")).respond_with(token_response("x")).expect(0).mount(&harness.server).await;

    let interceptor = AuthenticationInterceptor::new(harness.controller.clone());
    let request = interceptor
        .adapt(reqwest::Client::new().get("http://localhost/me"))
        .await
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(request.headers()["authorization"], "Bearer valid_access");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interceptor_fails_when_signed_out() {
    let harness = Harness::start().await;
    let interceptor = AuthenticationInterceptor::new(harness.controller.clone());

    let result = interceptor.adapt(reqwest::Client::new().get("http://localhost/me")).await;

    assert!(matches!(result, Err(AuthError::NotAuthenticated)));
}
