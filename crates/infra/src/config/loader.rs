//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the client credentials are not in the environment, falls back to a
//!    file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `BIKE_OAUTH_CLIENT_ID`: OAuth client identifier
//! - `BIKE_OAUTH_CLIENT_SECRET`: OAuth client secret
//!
//! Optional (defaults from [`bike_domain::constants`]):
//! - `BIKE_OAUTH_AUTHORIZATION_ENDPOINT`, `BIKE_OAUTH_TOKEN_ENDPOINT`
//! - `BIKE_OAUTH_REDIRECT_URI`, `BIKE_OAUTH_SCHEME`
//! - `BIKE_OAUTH_SCOPES`: space separated
//! - `BIKE_OAUTH_REQUEST_TIMEOUT_SECS`, `BIKE_OAUTH_SIGN_IN_TIMEOUT_SECS`
//! - `BIKE_API_BASE_URL`, `BIKE_API_TIMEOUT_SECS`
//! - `BIKE_KEYCHAIN_SERVICE`
//! - `BIKE_RETRY_MAX_RETRIES`, `BIKE_RETRY_DELAY_MS`
//! - `BIKE_LOG_LEVEL`, `BIKE_LOG_FORMAT` (`pretty` or `json`)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./bike.toml` or `./bike.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use bike_domain::{BikeError, Config, LogFormat, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `BikeError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `BikeError::Config` if the client credentials are missing or a
/// numeric value does not parse.
pub fn load_from_env() -> Result<Config> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Build a configuration from an arbitrary variable source
///
/// [`load_from_env`] passes the process environment; tests pass a map.
///
/// # Errors
/// Same as [`load_from_env`].
pub fn load_from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key).ok_or_else(|| {
            BikeError::Config(format!("Missing required environment variable: {}", key))
        })
    };

    let mut config = Config::default();

    config.oauth.client_id = required("BIKE_OAUTH_CLIENT_ID")?;
    config.oauth.client_secret = required("BIKE_OAUTH_CLIENT_SECRET")?;

    if let Some(value) = lookup("BIKE_OAUTH_AUTHORIZATION_ENDPOINT") {
        config.oauth.authorization_endpoint = value;
    }
    if let Some(value) = lookup("BIKE_OAUTH_TOKEN_ENDPOINT") {
        config.oauth.token_endpoint = value;
    }
    if let Some(value) = lookup("BIKE_OAUTH_REDIRECT_URI") {
        config.oauth.redirect_uri = value;
    }
    if let Some(value) = lookup("BIKE_OAUTH_SCHEME") {
        config.oauth.scheme = value;
    }
    if let Some(value) = lookup("BIKE_OAUTH_SCOPES") {
        config.oauth.scopes = value.split_whitespace().map(str::to_string).collect();
    }
    if let Some(value) = lookup("BIKE_OAUTH_REQUEST_TIMEOUT_SECS") {
        config.oauth.request_timeout_secs = parse_number("request timeout", &value)?;
    }
    if let Some(value) = lookup("BIKE_OAUTH_SIGN_IN_TIMEOUT_SECS") {
        config.oauth.sign_in_timeout_secs = parse_number("sign-in timeout", &value)?;
    }

    if let Some(value) = lookup("BIKE_API_BASE_URL") {
        config.api.base_url = value;
    }
    if let Some(value) = lookup("BIKE_API_TIMEOUT_SECS") {
        config.api.timeout_secs = parse_number("API timeout", &value)?;
    }

    if let Some(value) = lookup("BIKE_KEYCHAIN_SERVICE") {
        config.store.keychain_service = value;
    }

    if let Some(value) = lookup("BIKE_RETRY_MAX_RETRIES") {
        config.retry.max_retries = parse_number("max retries", &value)?;
    }
    if let Some(value) = lookup("BIKE_RETRY_DELAY_MS") {
        config.retry.delay_ms = parse_number("retry delay", &value)?;
    }

    if let Some(value) = lookup("BIKE_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Some(value) = lookup("BIKE_LOG_FORMAT") {
        config.logging.format = match value.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(BikeError::Config(format!("Invalid log format: {}", other))),
        };
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `BikeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BikeError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BikeError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BikeError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BikeError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BikeError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BikeError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["bike.toml", "bike.json", "config.toml", "config.json"];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn parse_number<T>(what: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| BikeError::Config(format!("Invalid {}: {}", what, e)))
}
