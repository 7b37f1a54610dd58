//! Port interfaces for the credential lifecycle.
//!
//! Adapters live in the infra crate (and in test support code); the
//! services in this crate only ever see these traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inboxflow_common::auth::pkce::PkceChallenge;
use inboxflow_common::auth::types::{Provider, ProviderError, ProviderTokens, UserProfile};
use inboxflow_common::error::AuthResult;

use super::model::{ConnectedAccount, User};

/// Shared TTL key-value store for authorization state, refresh locks,
/// and session credentials.
///
/// Backed by Redis in multi-instance deployments; an in-memory adapter
/// serves tests and single-instance dev. All keys expire, there is no
/// durable data behind this port.
#[async_trait]
pub trait EphemeralStateStore: Send + Sync {
    /// Store a value under `key`, replacing any existing value, expiring
    /// after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()>;

    /// Fetch the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> AuthResult<()>;

    /// Atomically store `value` under `key` only if the key is absent.
    /// Returns whether the write happened. This is the mutual-exclusion
    /// primitive for the refresh lock.
    async fn set_if_absent_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> AuthResult<bool>;
}

/// Durable storage for users and connected accounts.
///
/// Each method is atomic over the row(s) it names; the services never
/// require cross-call transactions.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a connected account by its stable id.
    async fn find_account(&self, account_id: &str) -> AuthResult<Option<ConnectedAccount>>;

    /// Look up a user's connected account for one provider.
    async fn find_account_by_user(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> AuthResult<Option<ConnectedAccount>>;

    /// Look up a user by email (the find-or-create key).
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Insert a new user record.
    async fn create_user(&self, user: &User) -> AuthResult<()>;

    /// Insert or fully replace a connected account.
    async fn upsert_account(&self, account: &ConnectedAccount) -> AuthResult<()>;

    /// Persist refreshed token material in one atomic write. A `None`
    /// refresh token means "keep the stored one"; the provider did not
    /// rotate.
    async fn update_account_tokens(
        &self,
        account_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Set the account status to `Revoked` and record why.
    async fn mark_account_revoked(&self, account_id: &str, sync_error: &str) -> AuthResult<()>;
}

/// One OAuth identity provider (Google, Microsoft).
///
/// Refresh failures must arrive pre-classified: the coordinator decides
/// between marking the account revoked and leaving it retryable purely
/// from the [`ProviderError`] variant.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Build the user-facing authorization URL carrying the state token
    /// and PKCE challenge.
    fn authorization_url(&self, state: &str, challenge: &PkceChallenge) -> String;

    /// Exchange an authorization code (plus the PKCE verifier) for
    /// tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<ProviderTokens, ProviderError>;

    /// Obtain a fresh access token from a refresh token.
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError>;

    /// Fetch the authenticated user's profile.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProviderError>;
}
