//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTHORIZATION_STORE_KEY, DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZATION_ENDPOINT,
    DEFAULT_CALLBACK_SCHEME, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RETRIES,
    DEFAULT_REDIRECT_URI, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS, DEFAULT_SCOPES,
    DEFAULT_SIGN_IN_TIMEOUT_SECS, DEFAULT_TOKEN_ENDPOINT,
};

/// Application configuration
///
/// Every section falls back to its defaults, so a file only needs to carry
/// the values that differ (usually the OAuth client credentials).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub oauth: OAuthSettings,
    pub api: ApiSettings,
    pub store: StoreSettings,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
}

/// OAuth provider configuration, loaded once at process start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub redirect_uri: String,
    pub scheme: String,
    pub scopes: Vec<String>,
    /// Upper bound for every token endpoint call
    pub request_timeout_secs: u64,
    /// Upper bound for the interactive browser step
    pub sign_in_timeout_secs: u64,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scheme: DEFAULT_CALLBACK_SCHEME.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sign_in_timeout_secs: DEFAULT_SIGN_IN_TIMEOUT_SECS,
        }
    }
}

/// Bike API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Secure store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Keychain service shared by every process of the application group
    pub keychain_service: String,
    pub key: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            key: AUTHORIZATION_STORE_KEY.to_string(),
        }
    }
}

/// Authenticated request retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, delay_ms: DEFAULT_RETRY_DELAY_MS }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), format: LogFormat::default() }
    }
}
