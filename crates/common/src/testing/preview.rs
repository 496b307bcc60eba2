//! Fixed-token authenticator for previews and UI tests

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::auth::{AuthError, Authenticator};

/// [`Authenticator`] that never talks to a provider
///
/// `access_token` always yields the same token; `sign_in`/`sign_out` only
/// toggle the authenticated flag.
#[derive(Debug)]
pub struct PreviewAuthenticator {
    authenticated: AtomicBool,
    token: String,
}

impl PreviewAuthenticator {
    /// Start signed in or out, with an empty token
    #[must_use]
    pub fn new(authenticated: bool) -> Self {
        Self { authenticated: AtomicBool::new(authenticated), token: String::new() }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }
}

impl Default for PreviewAuthenticator {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Authenticator for PreviewAuthenticator {
    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    fn can_sign_in(&self) -> bool {
        true
    }

    async fn sign_in(&self) -> Result<(), AuthError> {
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.authenticated.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_and_out_toggle_state() {
        let preview = PreviewAuthenticator::new(false).with_token("preview");

        assert!(!preview.is_authenticated().await);
        preview.sign_in().await.unwrap();
        assert!(preview.is_authenticated().await);
        assert_eq!(preview.access_token().await.unwrap(), "preview");

        preview.sign_out().await.unwrap();
        assert!(!preview.is_authenticated().await);
    }
}
