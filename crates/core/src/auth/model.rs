//! Domain models for users, connected accounts, and in-flight
//! authorization state.

use chrono::{DateTime, Utc};
use inboxflow_common::auth::types::{ClientFingerprint, Provider};
use serde::{Deserialize, Serialize};

/// A person who connected at least one mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new user record with a fresh time-ordered id.
    #[must_use]
    pub fn new(email: String, name: Option<String>, picture_url: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            email,
            name,
            picture_url,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle status of a connected account.
///
/// `Revoked` is terminal for automatic refresh: only a user-driven
/// reconnect (a fresh authorization flow) leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Syncing,
    Failed,
    Revoked,
}

/// A provider mailbox connected by a user, with its credentials
/// encrypted at rest.
///
/// `access_token` and `refresh_token` hold opaque encrypted blobs, not
/// plaintext. Only the refresh coordinator and callback validator ever
/// see decrypted token material, and neither logs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Stable id, `{provider}_{user_id}`.
    pub id: String,
    pub user_id: String,
    pub provider: Provider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: DateTime<Utc>,
    pub status: AccountStatus,
    pub sync_error: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Stable connected-account id for a user/provider pair. One account
/// per pair.
#[must_use]
pub fn account_id(provider: Provider, user_id: &str) -> String {
    format!("{provider}_{user_id}")
}

/// Server-side record of one in-flight authorization attempt, stored in
/// the ephemeral store under [`state_key`] and consumed exactly once at
/// callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
    pub pkce_verifier: String,
    pub fingerprint: ClientFingerprint,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral-store key for a pending authorization state.
#[must_use]
pub fn state_key(state_token: &str) -> String {
    format!("oauth:state:{state_token}")
}

/// Ephemeral-store key for the per-account refresh lock.
#[must_use]
pub fn refresh_lock_key(account_id: &str) -> String {
    format!("oauth:refresh-lock:{account_id}")
}

/// Ephemeral-store key for an issued session credential.
#[must_use]
pub fn session_key(session_token: &str) -> String {
    format!("session:{session_token}")
}
