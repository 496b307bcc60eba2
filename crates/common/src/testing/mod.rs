//! Testing utilities and helpers
//!
//! In-memory stand-ins for the external collaborators of the auth layer:
//! - **[`mocks::MockKeychainProvider`]**: shared in-memory [`SecretStore`]
//!   (clones see the same entries, like two processes on one keychain)
//! - **[`mocks::MockOAuthClient`]**: scripted identity provider with call
//!   counters
//! - **[`mocks::MockUserAgent`]**: scripted browser session
//! - **[`preview::PreviewAuthenticator`]**: fixed-token authenticator for
//!   previews and UI tests
//!
//! Downstream crates enable these with the `test-utils` feature.
//!
//! [`SecretStore`]: crate::security::SecretStore

pub mod mocks;
pub mod preview;

pub use mocks::{MockKeychainProvider, MockOAuthClient, MockOutcome, MockUserAgent};
pub use preview::PreviewAuthenticator;
