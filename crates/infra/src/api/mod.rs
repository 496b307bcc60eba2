//! Bike API client and its error types

mod client;
pub mod errors;

pub use client::{BikeApiClient, StatsGranularity, StatsQuery};
pub use errors::{ApiError, ApiErrorCategory};
