//! Retry policies with pluggable backoff
//!
//! A policy only *decides*; the caller owns the loop (and therefore whatever
//! per-attempt work has to be redone, such as re-attaching credentials).

use std::time::Duration;

/// Trait for determining whether a failed operation should be retried
pub trait RetryPolicy<E> {
    /// Decide what to do after `error`, given the number of retries already
    /// performed (`0` after the initial attempt failed)
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation after the given delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Linear backoff: initial_delay + (attempt * increment)
    Linear { initial_delay: Duration, increment: Duration },
    /// Exponential backoff: initial_delay * base^attempt, capped at max_delay
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Calculate the delay before retry number `attempt + 1`
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Linear { initial_delay, increment } => {
                *initial_delay + increment.saturating_mul(attempt)
            }
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Common policy implementations
pub mod policies {
    use super::{BackoffStrategy, Duration, RetryDecision, RetryPolicy};

    /// Retries any error up to `max_retries` times
    ///
    /// Deliberately blind to the error kind: an expired credential, a dropped
    /// connection and a 503 are all treated alike.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct BoundedRetry {
        max_retries: u32,
        backoff: BackoffStrategy,
    }

    impl BoundedRetry {
        /// Retry up to `max_retries` times with a fixed `delay` between
        /// attempts
        #[must_use]
        pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
            Self { max_retries, backoff: BackoffStrategy::Fixed(delay) }
        }

        /// Retry up to `max_retries` times using `backoff` for delays
        #[must_use]
        pub const fn with_backoff(max_retries: u32, backoff: BackoffStrategy) -> Self {
            Self { max_retries, backoff }
        }

        /// Maximum number of retries after the initial attempt
        #[must_use]
        pub const fn max_retries(&self) -> u32 {
            self.max_retries
        }

        /// Backoff applied between attempts
        #[must_use]
        pub const fn backoff(&self) -> BackoffStrategy {
            self.backoff
        }
    }

    impl<E> RetryPolicy<E> for BoundedRetry {
        fn should_retry(&self, _error: &E, attempt: u32) -> RetryDecision {
            if attempt < self.max_retries {
                RetryDecision::RetryAfter(self.backoff.calculate_delay(attempt))
            } else {
                RetryDecision::Stop
            }
        }
    }
}
