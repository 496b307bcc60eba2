//! Bike API client
//!
//! Issues the app's read requests against the bike API. Every request goes
//! through [`HttpClient`], so the installed interceptor attaches credentials
//! and decides on retries; this layer only builds URLs and decodes bodies.

use std::sync::Arc;
use std::time::Duration;

use bike_common::auth::RequestInterceptor;
use bike_domain::ApiSettings;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::errors::ApiError;
use crate::http::HttpClient;

/// Rides are listed newest first
const RIDE_ORDER: &str = "start_date;desc";

/// Bucket size for the stats endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsGranularity {
    Hourly,
    Daily,
}

impl StatsGranularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

/// Parameters of a stats request
#[derive(Debug, Clone)]
pub struct StatsQuery {
    pub from: DateTime<Utc>,
    pub till: DateTime<Utc>,
    pub granularity: StatsGranularity,
    /// IANA time zone used for bucketing, e.g. `Europe/Paris`
    pub tz: String,
}

/// Thin client for the bike API
///
/// Response types are chosen by the caller; anything implementing
/// `DeserializeOwned` works.
#[derive(Clone)]
pub struct BikeApiClient {
    http: Arc<HttpClient>,
    base_url: Url,
    timeout: Duration,
}

impl BikeApiClient {
    /// Create a client for `base_url` sending through `http`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if `base_url` is not an absolute URL
    pub fn new(base_url: &str, http: HttpClient, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self { http: Arc::new(http), base_url, timeout })
    }

    /// Build the client and its HTTP stack from settings
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the base URL is invalid or the HTTP
    /// client cannot be created
    pub fn from_settings(
        settings: &ApiSettings,
        interceptor: Arc<dyn RequestInterceptor>,
    ) -> Result<Self, ApiError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("bike/", env!("CARGO_PKG_VERSION")))
            .interceptor(interceptor)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?;

        Self::new(&settings.base_url, http, timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute a GET request and decode the JSON body
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotAuthenticated`] when signed out, a status
    /// category for non-success responses, and [`ApiError::Decode`] when the
    /// body does not match `T`
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "GET request");

        let mut request = self.http.request(Method::GET, url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self
            .http
            .send(request)
            .await
            .map_err(|err| ApiError::from_send(err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, url.as_str(), body));
        }

        let result: T = if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT
        {
            serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Decode(format!(
                    "No content response ({}), but response type cannot be deserialized from empty body",
                    status.as_u16()
                ))
            })?
        } else {
            response.json().await.map_err(|e| ApiError::Decode(e.to_string()))?
        };

        info!(path = %path, "GET request successful");
        Ok(result)
    }

    /// Profile of the signed-in user
    pub async fn profile<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.get("me", &[]).await
    }

    /// Bikes owned by the signed-in user
    pub async fn bikes<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.get("bike", &[]).await
    }

    /// One page of rides for `bike_id`, newest first
    pub async fn rides<T: DeserializeOwned>(
        &self,
        bike_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<T, ApiError> {
        self.get(
            &format!("v2/bike/{bike_id}/ride"),
            &[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("order", RIDE_ORDER.to_string()),
            ],
        )
        .await
    }

    /// Recorded locations of `bike_id` between `from` and `till`
    pub async fn locations<T: DeserializeOwned>(
        &self,
        bike_id: &str,
        from: DateTime<Utc>,
        till: DateTime<Utc>,
    ) -> Result<T, ApiError> {
        self.get(
            &format!("bike/{bike_id}/location"),
            &[("from", format_timestamp(from)), ("till", format_timestamp(till))],
        )
        .await
    }

    /// Aggregated ride statistics of `bike_id`
    pub async fn stats<T: DeserializeOwned>(
        &self,
        bike_id: &str,
        query: &StatsQuery,
    ) -> Result<T, ApiError> {
        self.get(
            &format!("bike/{bike_id}/stats"),
            &[
                ("from", format_timestamp(query.from)),
                ("till", format_timestamp(query.till)),
                ("type", query.granularity.as_str().to_string()),
                ("tz", query.tz.clone()),
            ],
        )
        .await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid API path {path}: {e}")))
    }

    fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
        let message = if body.is_empty() {
            format!("{} returned status {}", url, status)
        } else {
            format!("{} returned status {}: {}", url, status, body)
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ApiError::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            ApiError::RateLimit(message)
        } else if status.is_server_error() {
            ApiError::Server(message)
        } else if status.is_client_error() {
            ApiError::Client(message)
        } else {
            ApiError::Network(message)
        }
    }
}

impl std::fmt::Debug for BikeApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BikeApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Parse `base_url` and make sure relative joins append to its path
fn normalize_base_url(base_url: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ApiError::Config(format!("invalid API base URL {base_url}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
