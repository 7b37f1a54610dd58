//! Coordinated token refresh.
//!
//! `get_valid_token` is the single entry point every outbound provider
//! call goes through. The contention protocol guarantees at most one
//! refresh request per account per episode, across tasks and across
//! service instances:
//!
//! - fast path: token not near expiry, decrypt and return;
//! - holder path: won the set-if-absent lock, performs the refresh,
//!   releases the lock on every exit;
//! - waiter path: lost the lock, polls the account until the holder's
//!   write lands or the wait budget runs out.
//!
//! The lock TTL is the crash backstop: a holder that dies without
//! releasing blocks others for at most the TTL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use inboxflow_common::auth::types::{Provider, ProviderError};
use inboxflow_common::config::AuthSettings;
use inboxflow_common::crypto::TokenCipher;
use inboxflow_common::error::{AuthError, AuthResult};
use tracing::{debug, error, info, warn};

use super::model::{refresh_lock_key, AccountStatus, ConnectedAccount};
use super::ports::{CredentialStore, EphemeralStateStore, IdentityProvider};

/// Serves valid access tokens, refreshing through the distributed lock
/// when needed.
pub struct RefreshCoordinator {
    credentials: Arc<dyn CredentialStore>,
    state_store: Arc<dyn EphemeralStateStore>,
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
    cipher: Arc<TokenCipher>,
    settings: AuthSettings,
}

impl RefreshCoordinator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        state_store: Arc<dyn EphemeralStateStore>,
        providers: Vec<Arc<dyn IdentityProvider>>,
        cipher: Arc<TokenCipher>,
        settings: AuthSettings,
    ) -> Self {
        let providers = providers.into_iter().map(|p| (p.provider(), p)).collect();
        Self { credentials, state_store, providers, cipher, settings }
    }

    /// Return a decrypted access token guaranteed valid for at least
    /// the near-expiry window, refreshing first if necessary.
    ///
    /// # Errors
    /// - `AuthError::NotConnected` if no account exists under this id.
    /// - `AuthError::Revoked` if the account is revoked (no provider
    ///   call is made) or the provider invalidates the grant.
    /// - `AuthError::TransientRefresh` on retryable provider failures.
    /// - `AuthError::RefreshTimeout` if another holder's refresh did
    ///   not land within the wait budget.
    pub async fn get_valid_token(&self, account_id: &str) -> AuthResult<String> {
        let account = self
            .credentials
            .find_account(account_id)
            .await?
            .ok_or_else(|| AuthError::NotConnected(account_id.to_string()))?;

        if account.status == AccountStatus::Revoked {
            return Err(AuthError::Revoked(
                account
                    .sync_error
                    .unwrap_or_else(|| "account access revoked".to_string()),
            ));
        }

        if account.token_expires_at > self.freshness_threshold() {
            debug!(account_id, "access token still fresh");
            return self.cipher.decrypt(&account.access_token);
        }

        let lock_key = refresh_lock_key(account_id);
        let acquired = self
            .state_store
            .set_if_absent_with_ttl(&lock_key, "1", self.settings.lock_ttl)
            .await?;

        if acquired {
            let result = self.refresh_locked(account_id).await;
            // Unconditional release; the TTL only covers crashes.
            if let Err(e) = self.state_store.delete(&lock_key).await {
                warn!(account_id, error = %e, "failed to release refresh lock");
            }
            result
        } else {
            debug!(account_id, "refresh in flight elsewhere, waiting");
            self.wait_for_refresh(account_id).await
        }
    }

    /// Instant before which a token is considered stale. Tokens are
    /// refreshed while they still have the full near-expiry window
    /// left, so callers never receive a token about to die mid-request.
    fn freshness_threshold(&self) -> DateTime<Utc> {
        Utc::now()
            + chrono::Duration::from_std(self.settings.near_expiry_window).unwrap_or_default()
    }

    /// Holder path. Re-reads the account under the lock: the token may
    /// have been refreshed by a previous holder between our staleness
    /// check and the lock acquisition.
    async fn refresh_locked(&self, account_id: &str) -> AuthResult<String> {
        let account = self
            .credentials
            .find_account(account_id)
            .await?
            .ok_or_else(|| AuthError::NotConnected(account_id.to_string()))?;

        if account.status == AccountStatus::Revoked {
            return Err(AuthError::Revoked(
                account
                    .sync_error
                    .unwrap_or_else(|| "account access revoked".to_string()),
            ));
        }

        if account.token_expires_at > self.freshness_threshold() {
            debug!(account_id, "token refreshed while acquiring lock");
            return self.cipher.decrypt(&account.access_token);
        }

        self.refresh_as_holder(&account).await
    }

    async fn refresh_as_holder(&self, account: &ConnectedAccount) -> AuthResult<String> {
        let Some(refresh_blob) = account.refresh_token.as_deref() else {
            // Nothing to refresh with. Not marked revoked: the stored
            // status still reflects what the provider last told us.
            return Err(AuthError::Revoked(
                "no refresh token on file; reconnect required".to_string(),
            ));
        };
        let refresh_token = self.cipher.decrypt(refresh_blob)?;

        let adapter = self.providers.get(&account.provider).ok_or_else(|| {
            AuthError::Config(format!("no adapter registered for {}", account.provider))
        })?;

        match adapter.refresh_access_token(&refresh_token).await {
            Ok(tokens) => {
                let encrypted_access = self.cipher.encrypt(&tokens.access_token)?;
                let encrypted_refresh = match &tokens.refresh_token {
                    Some(rt) => Some(self.cipher.encrypt(rt)?),
                    None => None,
                };

                self.credentials
                    .update_account_tokens(
                        &account.id,
                        &encrypted_access,
                        encrypted_refresh.as_deref(),
                        tokens.expires_at,
                    )
                    .await?;

                info!(
                    account_id = %account.id,
                    provider = %account.provider,
                    rotated = tokens.refresh_token.is_some(),
                    "access token refreshed"
                );

                Ok(tokens.access_token)
            }
            Err(ProviderError::GrantInvalid(reason)) => {
                error!(
                    account_id = %account.id,
                    provider = %account.provider,
                    %reason,
                    "provider invalidated the grant, marking account revoked"
                );

                let sync_error = format!("token refresh rejected: {reason}");
                if let Err(e) = self
                    .credentials
                    .mark_account_revoked(&account.id, &sync_error)
                    .await
                {
                    warn!(account_id = %account.id, error = %e, "failed to persist revocation");
                }

                Err(AuthError::Revoked(reason))
            }
            Err(ProviderError::Transient { message, retry_after }) => {
                warn!(
                    account_id = %account.id,
                    provider = %account.provider,
                    %message,
                    "transient refresh failure, account left untouched"
                );
                Err(AuthError::TransientRefresh { message, retry_after })
            }
            Err(ProviderError::Protocol(message)) => {
                warn!(
                    account_id = %account.id,
                    provider = %account.provider,
                    %message,
                    "protocol error during refresh, account left untouched"
                );
                Err(AuthError::TransientRefresh { message, retry_after: None })
            }
        }
    }

    /// Poll the account until the lock holder's refreshed tokens land.
    async fn wait_for_refresh(&self, account_id: &str) -> AuthResult<String> {
        for _ in 0..self.settings.lock_wait_attempts {
            tokio::time::sleep(self.settings.lock_wait_interval).await;

            let Some(account) = self.credentials.find_account(account_id).await? else {
                return Err(AuthError::NotConnected(account_id.to_string()));
            };

            if account.status == AccountStatus::Revoked {
                return Err(AuthError::Revoked(
                    account
                        .sync_error
                        .unwrap_or_else(|| "account access revoked".to_string()),
                ));
            }

            if account.token_expires_at > self.freshness_threshold() {
                return self.cipher.decrypt(&account.access_token);
            }
        }

        warn!(account_id, "gave up waiting for in-flight refresh");
        Err(AuthError::RefreshTimeout)
    }
}
