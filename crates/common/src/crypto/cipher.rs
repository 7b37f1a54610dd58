//! AES-256-GCM token cipher.
//!
//! Wire format: `base64url(nonce(12 bytes) ‖ ciphertext‖tag)`. A fresh
//! random 96-bit nonce is generated internally on every call; callers
//! never supply nonces, because nonce reuse under the same key breaks
//! GCM entirely. Decryption fails closed: any tag mismatch, malformed
//! encoding, or truncated input is an error, never degraded plaintext.
//!
//! Empty plaintext maps to empty ciphertext (and vice versa) so
//! optional token fields round-trip without special casing.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{AuthError, AuthResult};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Authenticated symmetric cipher for token strings.
///
/// Constructed once at startup from the configured key and passed to
/// every consumer; there is no lazily-initialized process singleton and
/// no implicit key fallback.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").field("key", &"[REDACTED]").finish()
    }
}

impl TokenCipher {
    /// Create a cipher from a raw 32-byte key.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the key is not exactly 32 bytes.
    pub fn new(key: &[u8]) -> AuthResult<Self> {
        if key.len() != KEY_LEN {
            return Err(AuthError::Config(format!(
                "token encryption key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| AuthError::Config(format!("failed to initialize cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Create a cipher from a base64url-encoded 32-byte key, as stored
    /// in configuration.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if decoding fails or the decoded key
    /// has the wrong length.
    pub fn from_base64_key(key_b64: &str) -> AuthResult<Self> {
        let key = URL_SAFE_NO_PAD
            .decode(key_b64.trim_end_matches('='))
            .map_err(|e| AuthError::Config(format!("invalid base64 encryption key: {e}")))?;
        Self::new(&key)
    }

    /// Generate a random 256-bit key, e.g. for dev environments or key
    /// provisioning tooling.
    #[must_use]
    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encrypt a token string into an opaque blob.
    ///
    /// Two encryptions of the same plaintext never produce the same
    /// blob because the nonce is random per call.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the underlying AEAD fails,
    /// which does not happen for well-formed keys.
    pub fn encrypt(&self, plaintext: &str) -> AuthResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), plaintext.as_bytes())
            .map_err(|e| AuthError::Internal(format!("encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    /// Returns `AuthError::Decryption` on malformed encoding, truncated
    /// input, or authentication-tag mismatch. The error is raised, not
    /// logged-and-swallowed: callers on token paths must treat it as
    /// fatal for the operation.
    pub fn decrypt(&self, blob: &str) -> AuthResult<String> {
        if blob.is_empty() {
            return Ok(String::new());
        }

        let data = URL_SAFE_NO_PAD
            .decode(blob.trim_end_matches('='))
            .map_err(|e| AuthError::Decryption(format!("invalid base64: {e}")))?;

        if data.len() <= NONCE_LEN {
            return Err(AuthError::Decryption("blob shorter than nonce".to_string()));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce_array: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| AuthError::Decryption("invalid nonce length".to_string()))?;

        let plaintext = self
            .cipher
            .decrypt(&Nonce::from(nonce_array), ciphertext)
            .map_err(|_| AuthError::Decryption("authentication failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AuthError::Decryption("plaintext is not valid UTF-8".to_string()))
    }
}
