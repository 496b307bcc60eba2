//! HTTP transport with interceptor-driven retries

mod client;

pub use client::{HttpClient, HttpClientBuilder, SendError};
