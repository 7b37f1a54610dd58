//! Session credential issuance.
//!
//! A session credential is an opaque random token mapping to a user id
//! in the ephemeral store. It carries no claims and cannot be validated
//! offline; resolving it is a store lookup, revoking it is a delete.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use inboxflow_common::auth::pkce::generate_state_token;
use inboxflow_common::error::AuthResult;
use tracing::debug;

use super::model::session_key;
use super::ports::EphemeralStateStore;

/// An issued session credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    /// Opaque 32-byte base64url token handed to the client.
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and resolves session credentials against the ephemeral store.
pub struct SessionIssuer {
    store: Arc<dyn EphemeralStateStore>,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(store: Arc<dyn EphemeralStateStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint a fresh credential for `user_id`.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store write fails.
    pub async fn issue(&self, user_id: &str) -> AuthResult<SessionCredential> {
        let token = generate_state_token();
        self.store
            .set_with_ttl(&session_key(&token), user_id, self.ttl)
            .await?;

        debug!(user_id, "issued session credential");

        Ok(SessionCredential {
            token,
            user_id: user_id.to_string(),
            expires_at: Utc::now() + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
        })
    }

    /// Resolve a presented token to its user id, if the session is
    /// still live.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store lookup fails.
    pub async fn resolve(&self, token: &str) -> AuthResult<Option<String>> {
        self.store.get(&session_key(token)).await
    }

    /// Invalidate a session (logout). Idempotent.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store delete fails.
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        self.store.delete(&session_key(token)).await
    }
}
