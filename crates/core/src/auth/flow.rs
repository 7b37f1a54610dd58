//! Authorization flow: begin (redirect construction) and complete
//! (callback validation through session issuance).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use inboxflow_common::auth::pkce::{generate_state_token, PkceChallenge};
use inboxflow_common::auth::types::{ClientFingerprint, Provider};
use inboxflow_common::config::AuthSettings;
use inboxflow_common::crypto::TokenCipher;
use inboxflow_common::error::{AuthError, AuthResult};
use tracing::{debug, info, warn};

use super::model::{
    account_id, state_key, AccountStatus, AuthorizationState, ConnectedAccount, User,
};
use super::ports::{CredentialStore, EphemeralStateStore, IdentityProvider};
use super::session::{SessionCredential, SessionIssuer};

/// The two public operations of the subsystem: `begin` hands out an
/// authorization URL bound to server-side state, `complete` validates
/// the provider callback and turns it into a session.
pub struct AuthorizationFlow {
    state_store: Arc<dyn EphemeralStateStore>,
    credentials: Arc<dyn CredentialStore>,
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
    cipher: Arc<TokenCipher>,
    sessions: SessionIssuer,
    settings: AuthSettings,
}

impl AuthorizationFlow {
    pub fn new(
        state_store: Arc<dyn EphemeralStateStore>,
        credentials: Arc<dyn CredentialStore>,
        providers: Vec<Arc<dyn IdentityProvider>>,
        cipher: Arc<TokenCipher>,
        settings: AuthSettings,
    ) -> Self {
        let sessions = SessionIssuer::new(Arc::clone(&state_store), settings.session_ttl);
        let providers = providers.into_iter().map(|p| (p.provider(), p)).collect();
        Self { state_store, credentials, providers, cipher, sessions, settings }
    }

    /// Session issuer sharing this flow's store and TTL, for callers
    /// that resolve or revoke sessions outside the flow.
    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Start an authorization attempt: generate PKCE material and a
    /// state token, persist the server-side state, and return the URL
    /// to redirect the user to.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if no adapter is registered for the
    /// provider, or `AuthError::Storage` if the state write fails.
    pub async fn begin(
        &self,
        provider: Provider,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<String> {
        let adapter = self.adapter(provider)?;

        let challenge = PkceChallenge::generate();
        let state_token = generate_state_token();

        let state = AuthorizationState {
            pkce_verifier: challenge.verifier.clone(),
            fingerprint,
            created_at: Utc::now(),
        };

        self.state_store
            .set_with_ttl(
                &state_key(&state_token),
                &serde_json::to_string(&state)?,
                self.settings.state_ttl,
            )
            .await?;

        debug!(%provider, "authorization flow started");

        Ok(adapter.authorization_url(&state_token, &challenge))
    }

    /// Validate a provider callback and finish the flow.
    ///
    /// The state is deleted before the code exchange regardless of the
    /// exchange outcome, so a given state token gets exactly one
    /// exchange attempt.
    ///
    /// # Errors
    /// - `AuthError::InvalidState` if the state is unknown or expired.
    /// - `AuthError::AuthExchange` if the provider rejects the code
    ///   exchange or the profile fetch fails.
    pub async fn complete(
        &self,
        provider: Provider,
        code: &str,
        state_token: &str,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<(User, SessionCredential)> {
        let adapter = self.adapter(provider)?;

        let key = state_key(state_token);
        let raw = self
            .state_store
            .get(&key)
            .await?
            .ok_or(AuthError::InvalidState)?;
        let state: AuthorizationState =
            serde_json::from_str(&raw).map_err(|_| AuthError::InvalidState)?;

        // Soft check. Legitimate agents change across redirects often
        // enough that a mismatch is a signal, not a rejection.
        if state.fingerprint.user_agent != fingerprint.user_agent {
            warn!(
                %provider,
                stored = %state.fingerprint.user_agent,
                presented = %fingerprint.user_agent,
                "user agent changed between begin and callback"
            );
        }

        // Single-use: gone before the exchange, success or not.
        self.state_store.delete(&key).await?;

        let tokens = adapter
            .exchange_code(code, &state.pkce_verifier)
            .await
            .map_err(|e| AuthError::AuthExchange(e.to_string()))?;

        let profile = adapter
            .fetch_profile(&tokens.access_token)
            .await
            .map_err(|e| AuthError::AuthExchange(format!("profile fetch failed: {e}")))?;

        let user = match self.credentials.find_user_by_email(&profile.email).await? {
            Some(existing) => existing,
            None => {
                let user = User::new(profile.email.clone(), profile.name, profile.picture);
                self.credentials.create_user(&user).await?;
                user
            }
        };

        let encrypted_access = self.cipher.encrypt(&tokens.access_token)?;
        let encrypted_refresh = match &tokens.refresh_token {
            Some(rt) => Some(self.cipher.encrypt(rt)?),
            None => None,
        };

        let existing = self
            .credentials
            .find_account_by_user(&user.id, provider)
            .await?;

        // Providers only return a refresh token on first consent (or
        // with prompt=consent); when they omit it, the stored one is
        // still the live grant and must survive the reconnect.
        let refresh_token = match (encrypted_refresh, &existing) {
            (Some(fresh), _) => Some(fresh),
            (None, Some(account)) => account.refresh_token.clone(),
            (None, None) => None,
        };

        let account = ConnectedAccount {
            id: account_id(provider, &user.id),
            user_id: user.id.clone(),
            provider,
            access_token: encrypted_access,
            refresh_token,
            token_expires_at: tokens.expires_at,
            status: AccountStatus::Active,
            sync_error: None,
            last_sync_at: existing.as_ref().and_then(|a| a.last_sync_at),
            created_at: existing
                .as_ref()
                .map_or_else(Utc::now, |a| a.created_at),
        };
        self.credentials.upsert_account(&account).await?;

        let session = self.sessions.issue(&user.id).await?;

        info!(%provider, user_id = %user.id, "authorization flow completed");

        Ok((user, session))
    }

    fn adapter(&self, provider: Provider) -> AuthResult<&Arc<dyn IdentityProvider>> {
        self.providers
            .get(&provider)
            .ok_or_else(|| AuthError::Config(format!("no adapter registered for {provider}")))
    }
}
