//! Security primitives and utilities
//!
//! Generic secret storage used by the auth layer:
//! - [`traits::SecretStore`]: backend-agnostic key/value secret storage
//! - [`keychain::KeychainProvider`]: platform keychain implementation
//!   (feature `platform`)

#[cfg(feature = "platform")]
pub mod keychain;
pub mod traits;

#[cfg(feature = "platform")]
pub use keychain::KeychainProvider;
pub use traits::{KeychainError, SecretStore};
