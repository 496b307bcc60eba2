//! # Bike Infrastructure
//!
//! Runtime wiring for the bike authentication core.
//!
//! This crate contains:
//! - Configuration loading (environment, JSON/TOML files)
//! - The HTTP send loop driven by a request interceptor
//! - The bike API client
//! - The loopback browser user agent for desktop sign-in
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements the seams defined in `bike-common::auth`
//! - Depends on `bike-common` and `bike-domain`
//! - Contains all "impure" code (sockets, browser, keychain, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod observability;
pub mod session;

// Re-export commonly used items
pub use api::{ApiError, BikeApiClient};
pub use errors::InfraError;
pub use http::{HttpClient, SendError};
pub use oauth::LoopbackUserAgent;
pub use observability::init_tracing;
pub use session::BikeSession;
