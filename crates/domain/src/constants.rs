//! Application constants
//!
//! Centralized location for the domain-level defaults used throughout the
//! application.

// OAuth provider defaults
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://login.conneq.tech/v1/login";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://api.ids.conneq.tech/oauth";
pub const DEFAULT_REDIRECT_URI: &str = "tech.conneq.decathlon://decathlon.app.ids.conneq.tech";
pub const DEFAULT_CALLBACK_SCHEME: &str = "tech.conneq.decathlon";
pub const DEFAULT_SCOPES: [&str; 2] = ["openid", "profile"];

// Network timeouts
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SIGN_IN_TIMEOUT_SECS: u64 = 300;

// Bike API
pub const DEFAULT_API_BASE_URL: &str = "https://decathlon.api.bike.conneq.tech";

// Secure store (keychain service shared by the app group, fixed entry key)
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "tech.conneq.decathlon.shared";
pub const AUTHORIZATION_STORE_KEY: &str = "bike.authorization";

// Request retry policy
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
