//! Resilience patterns for transient failures
//!
//! Generic retry policies and backoff strategies. Policies are generic over
//! the error type so the same building blocks serve the HTTP layer and any
//! other caller that owns its own retry loop.

pub mod retry;

// Re-export retry types
pub use retry::policies::BoundedRetry;
pub use retry::{policies, BackoffStrategy, RetryDecision, RetryPolicy};
