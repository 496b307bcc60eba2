//! Composition root for an authenticated bike session
//!
//! Wires the keychain-backed store, OAuth client, authenticator, request
//! interceptor and API client from one [`Config`]. Every process of the app
//! builds its own session; they share state only through the keychain.

use std::sync::Arc;
use std::time::Duration;

use bike_common::auth::{
    AuthenticationController, AuthenticationInterceptor, Authenticator, OAuthClient,
    OAuthConfiguration, SecureTokenStore,
};
use bike_common::resilience::BoundedRetry;
use bike_common::security::KeychainProvider;
use bike_common::SecretStore;
use bike_domain::{BikeError, Config, OAuthSettings, RetrySettings};
use tracing::{debug, info};

use crate::api::BikeApiClient;
use crate::oauth::LoopbackUserAgent;

/// Authenticated access to the bike API
pub struct BikeSession {
    authenticator: Arc<dyn Authenticator>,
    api: BikeApiClient,
}

impl BikeSession {
    /// Build a session on the platform keychain
    ///
    /// Sign-in is available when the configured redirect URI can be served
    /// from a loopback listener; otherwise the session only consumes tokens
    /// another process signed in with.
    ///
    /// # Errors
    /// Returns `BikeError::Config` if the API settings are invalid or an HTTP
    /// client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, BikeError> {
        let keychain = KeychainProvider::new(config.store.keychain_service.clone());
        Self::with_secret_store(config, keychain)
    }

    /// Build a session on an arbitrary secret backend
    ///
    /// # Errors
    /// Same as [`BikeSession::from_config`].
    pub fn with_secret_store<S>(config: &Config, secrets: S) -> Result<Self, BikeError>
    where
        S: SecretStore + 'static,
    {
        let oauth_client = OAuthClient::new(oauth_configuration(&config.oauth))
            .map_err(|e| BikeError::Config(format!("failed to build OAuth client: {e}")))?;
        let store = SecureTokenStore::with_key(secrets, config.store.key.clone());
        let mut controller = AuthenticationController::new(Arc::new(oauth_client), Arc::new(store));

        match LoopbackUserAgent::from_settings(&config.oauth) {
            Ok(user_agent) => controller = controller.with_user_agent(Arc::new(user_agent)),
            Err(reason) => debug!(%reason, "Interactive sign-in disabled"),
        }

        Self::with_authenticator(config, Arc::new(controller))
    }

    /// Build the API side around an existing authenticator
    ///
    /// # Errors
    /// Same as [`BikeSession::from_config`].
    pub fn with_authenticator(
        config: &Config,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self, BikeError> {
        let interceptor = AuthenticationInterceptor::new(Arc::clone(&authenticator))
            .with_retry_policy(retry_policy(&config.retry));
        let api = BikeApiClient::from_settings(&config.api, Arc::new(interceptor))?;

        info!(
            api = %api.base_url(),
            can_sign_in = authenticator.can_sign_in(),
            "Bike session ready"
        );

        Ok(Self { authenticator, api })
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub fn api(&self) -> &BikeApiClient {
        &self.api
    }
}

/// Translate loaded settings into the OAuth client's configuration
pub fn oauth_configuration(settings: &OAuthSettings) -> OAuthConfiguration {
    OAuthConfiguration::new(
        settings.client_id.clone(),
        settings.client_secret.clone(),
        settings.authorization_endpoint.clone(),
        settings.token_endpoint.clone(),
        settings.redirect_uri.clone(),
        settings.scheme.clone(),
    )
    .with_scopes(settings.scopes.clone())
    .with_request_timeout(Duration::from_secs(settings.request_timeout_secs))
}

fn retry_policy(settings: &RetrySettings) -> BoundedRetry {
    BoundedRetry::fixed(settings.max_retries, Duration::from_millis(settings.delay_ms))
}

#[cfg(test)]
mod tests {
    use bike_common::testing::MockKeychainProvider;

    use super::*;

    #[test]
    fn test_oauth_configuration_carries_settings() {
        let mut settings = OAuthSettings::default();
        settings.client_id = "bike-app".into();
        settings.scopes = vec!["openid".into()];
        settings.request_timeout_secs = 7;

        let config = oauth_configuration(&settings);

        assert_eq!(config.client_id, "bike-app");
        assert_eq!(config.scope_string(), "openid");
        assert_eq!(config.request_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let policy = retry_policy(&RetrySettings { max_retries: 2, delay_ms: 50 });

        assert_eq!(policy.max_retries(), 2);
        assert_eq!(
            policy.backoff(),
            bike_common::resilience::BackoffStrategy::Fixed(Duration::from_millis(50))
        );
    }

    #[tokio::test]
    async fn test_custom_scheme_session_cannot_sign_in() {
        let config = Config::default();

        let session =
            BikeSession::with_secret_store(&config, MockKeychainProvider::new("bike.test")).unwrap();

        assert!(!session.authenticator().can_sign_in());
        assert!(!session.authenticator().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_loopback_session_can_sign_in() {
        let mut config = Config::default();
        config.oauth.redirect_uri = "http://127.0.0.1:8765/callback".into();

        let session =
            BikeSession::with_secret_store(&config, MockKeychainProvider::new("bike.test")).unwrap();

        assert!(session.authenticator().can_sign_in());
    }

    #[test]
    fn test_invalid_api_url_is_config_error() {
        let mut config = Config::default();
        config.api.base_url = "::not a url::".into();

        let result = BikeSession::with_secret_store(&config, MockKeychainProvider::new("bike.test"));

        assert!(matches!(result, Err(BikeError::Config(_))));
    }
}
