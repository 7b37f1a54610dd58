//! PKCE (Proof Key for Code Exchange) and state-token generation.
//!
//! Implements the S256 challenge method from RFC 7636. Verifiers and
//! state tokens are drawn from the OS random number generator and
//! encoded base64url without padding, so they are safe to carry in
//! query strings unmodified.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Byte length of the random verifier material. Encodes to 43
/// characters, the RFC 7636 minimum.
const VERIFIER_LEN: usize = 32;

/// Byte length of opaque token material (state and session tokens).
const STATE_LEN: usize = 32;

/// A PKCE verifier/challenge pair for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Secret verifier, held server-side until the code exchange.
    pub verifier: String,
    /// Public challenge sent in the authorization URL.
    pub challenge: String,
    /// Challenge method, always `S256`.
    pub method: &'static str,
}

impl PkceChallenge {
    /// Generate a fresh verifier and its S256 challenge.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        Self { verifier, challenge, method: "S256" }
    }
}

/// Generate a random PKCE code verifier (43 base64url characters).
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_LEN];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the S256 code challenge for a verifier:
/// `base64url(sha256(verifier))` without padding.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate an unguessable URL-safe token, used both for the CSRF
/// state parameter and for opaque session credentials.
#[must_use]
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_LEN];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
