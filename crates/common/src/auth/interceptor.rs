//! Bearer-token injection and retry decisions for outgoing requests
//!
//! The HTTP layer owns the send loop; an interceptor only prepares each
//! attempt (`adapt`) and decides whether a failed attempt is repeated
//! (`retry`). Because `adapt` runs again before every retry, a token that was
//! refreshed in between is picked up automatically.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};

use super::authenticator::AuthError;
use super::traits::Authenticator;
use crate::resilience::{BoundedRetry, RetryDecision, RetryPolicy};

/// Retries attempted after the initial request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pause before each retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Why a single attempt failed
#[derive(Debug)]
pub enum RequestFailure {
    /// The request never produced a response
    Transport(reqwest::Error),
    /// The server answered with a non-success status
    Status(StatusCode),
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Status(status) => write!(f, "HTTP {status}"),
        }
    }
}

/// Per-attempt hooks used by the HTTP send loop
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Prepare an attempt
    ///
    /// # Errors
    /// An error aborts the request before anything is sent
    async fn adapt(&self, request: RequestBuilder) -> Result<RequestBuilder, AuthError>;

    /// Decide whether to repeat a failed attempt (`attempt` counts retries
    /// already performed)
    fn retry(&self, attempt: u32, failure: &RequestFailure) -> RetryDecision;
}

/// Adds `Authorization: Bearer <token>` and retries with a fixed delay
pub struct AuthenticationInterceptor {
    authenticator: Arc<dyn Authenticator>,
    retry_policy: BoundedRetry,
}

impl AuthenticationInterceptor {
    /// Interceptor with 3 retries spaced one second apart
    #[must_use]
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            retry_policy: BoundedRetry::fixed(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: BoundedRetry) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[must_use]
    pub fn retry_policy(&self) -> BoundedRetry {
        self.retry_policy
    }
}

impl fmt::Debug for AuthenticationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationInterceptor")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RequestInterceptor for AuthenticationInterceptor {
    async fn adapt(&self, request: RequestBuilder) -> Result<RequestBuilder, AuthError> {
        let token = self.authenticator.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    fn retry(&self, attempt: u32, failure: &RequestFailure) -> RetryDecision {
        self.retry_policy.should_retry(failure, attempt)
    }
}
