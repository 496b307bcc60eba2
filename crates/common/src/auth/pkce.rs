//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` challenge method. A fresh pair is
//! generated for every sign-in attempt and discarded once the code exchange
//! finishes; nothing here is ever persisted.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Random bytes drawn for a default verifier (encodes to 67 characters)
pub const DEFAULT_VERIFIER_BYTES: usize = 50;

/// Shortest verifier RFC 7636 accepts
pub const MIN_VERIFIER_LEN: usize = 43;

/// Longest verifier RFC 7636 accepts
pub const MAX_VERIFIER_LEN: usize = 128;

/// Errors raised while generating PKCE values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PkceError {
    #[error(
        "code verifier must be {MIN_VERIFIER_LEN}-{MAX_VERIFIER_LEN} characters, \
         {byte_len} random bytes encode to {encoded_len}"
    )]
    InvalidLength { byte_len: usize, encoded_len: usize },
}

/// Generate a cryptographically secure code verifier of the default length
///
/// Returns the URL-safe, unpadded base64 encoding of
/// [`DEFAULT_VERIFIER_BYTES`] random bytes.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_url_safe(DEFAULT_VERIFIER_BYTES)
}

/// Generate a code verifier from `byte_len` random bytes
///
/// # Errors
/// Returns [`PkceError::InvalidLength`] when the encoded verifier would fall
/// outside the 43-128 character range (i.e. `byte_len` outside 32..=96).
pub fn generate_code_verifier_with_length(byte_len: usize) -> Result<String, PkceError> {
    let encoded_len = byte_len.div_ceil(3) * 4 - padding_for(byte_len);
    if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&encoded_len) {
        return Err(PkceError::InvalidLength { byte_len, encoded_len });
    }
    Ok(random_url_safe(byte_len))
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier))).
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

fn random_url_safe(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

// Unpadded base64 drops one output char per missing input byte in the last
// 3-byte group.
const fn padding_for(byte_len: usize) -> usize {
    match byte_len % 3 {
        1 => 2,
        2 => 1,
        _ => 0,
    }
}

/// PKCE verifier/challenge pair for one authorization attempt
#[derive(Clone)]
pub struct PkceChallenge {
    /// Random string sent only during the token exchange
    pub code_verifier: String,

    /// SHA256 of `code_verifier`, sent with the authorization request
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a new pair with a default-length verifier
    ///
    /// # Examples
    /// ```
    /// use bike_common::auth::pkce::PkceChallenge;
    ///
    /// let pkce = PkceChallenge::generate();
    /// assert!(pkce.code_verifier.len() >= 43);
    /// assert!(pkce.code_verifier.len() <= 128);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_code_verifier())
    }

    /// Build the pair for an existing verifier
    #[must_use]
    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}
