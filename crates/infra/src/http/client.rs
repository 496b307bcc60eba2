use std::sync::Arc;
use std::time::Duration;

use bike_common::auth::{AuthError, RequestFailure, RequestInterceptor};
use bike_common::resilience::{BackoffStrategy, BoundedRetry, RetryDecision, RetryPolicy};
use bike_domain::BikeError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Why [`HttpClient::send`] gave up
#[derive(Debug, Error)]
pub enum SendError {
    /// Preparing the request failed (no credentials); nothing was sent
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The last attempt hit the client timeout
    #[error("HTTP request timed out")]
    Timeout,

    #[error(transparent)]
    Transport(#[from] BikeError),
}

/// HTTP client with interceptor hooks, retry and timeout support.
///
/// With an interceptor, every attempt is adapted by it and retries follow its
/// decisions; without one, the client's own [`BoundedRetry`] applies.
/// Non-success statuses are retried like transport failures; once retries are
/// exhausted the last response is returned as-is for the caller to map.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    interceptor: Option<Arc<dyn RequestInterceptor>>,
    retry_policy: BoundedRetry,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, BikeError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, SendError> {
        let mut attempt: u32 = 0;

        loop {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                BikeError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let adapted = match &self.interceptor {
                Some(interceptor) => interceptor.adapt(cloned_builder).await?,
                None => cloned_builder,
            };

            let request = adapted.build().map_err(|err| BikeError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            let (failure, response) = match self.client.execute(request).await {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt = attempt + 1, %method, %url, status = %response.status(), "received HTTP response");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP error status");
                    (RequestFailure::Status(status), Some(response))
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");
                    (RequestFailure::Transport(err), None)
                }
            };

            if let RetryDecision::RetryAfter(delay) = self.retry_decision(attempt, &failure) {
                warn!(attempt = attempt + 1, %method, %url, failure = %failure, ?delay, "retrying HTTP request");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
                continue;
            }

            if let Some(response) = response {
                return Ok(response);
            }

            return Err(match failure {
                RequestFailure::Transport(err) if err.is_timeout() => SendError::Timeout,
                RequestFailure::Transport(err) => BikeError::from(InfraError::from(err)).into(),
                RequestFailure::Status(status) => BikeError::Network(format!("HTTP {status}")).into(),
            });
        }
    }

    fn retry_decision(&self, attempt: u32, failure: &RequestFailure) -> RetryDecision {
        match &self.interceptor {
            Some(interceptor) => interceptor.retry(attempt, failure),
            None => self.retry_policy.should_retry(failure, attempt),
        }
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    timeout: Duration,
    retry_policy: BoundedRetry,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
    interceptor: Option<Arc<dyn RequestInterceptor>>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_policy: BoundedRetry::with_backoff(
                2,
                BackoffStrategy::Exponential {
                    initial_delay: Duration::from_millis(200),
                    base: 2.0,
                    max_delay: Duration::from_secs(5),
                },
            ),
            user_agent: None,
            default_headers: None,
            interceptor: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry policy used when no interceptor is installed.
    pub fn retry_policy(mut self, policy: BoundedRetry) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Adapt every attempt and delegate retry decisions to `interceptor`.
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn build(self) -> Result<HttpClient, BikeError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            BikeError::from(infra)
        })?;

        Ok(HttpClient { client, interceptor: self.interceptor, retry_policy: self.retry_policy })
    }
}
