//! Shared test helpers for `inboxflow-core` integration tests.
//!
//! Provides in-memory adapters for the store ports and a scripted
//! identity provider, so flow and refresh tests can focus on behavior
//! instead of wiring.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use inboxflow_core::auth::model::{ConnectedAccount, User};
use inboxflow_core::auth::ports::{CredentialStore, EphemeralStateStore, IdentityProvider};
use inboxflow_common::auth::pkce::PkceChallenge;
use inboxflow_common::auth::types::{Provider, ProviderError, ProviderTokens, UserProfile};
use inboxflow_common::error::AuthResult;

/// In-memory `EphemeralStateStore` with real TTL expiry.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(entries: &mut HashMap<String, (String, Instant)>, key: &str) -> Option<String> {
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl EphemeralStateStore for MemoryStateStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        Ok(Self::live_value(&mut entries, key))
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> AuthResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        if Self::live_value(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(true)
    }
}

/// In-memory `CredentialStore` over mutex-guarded maps.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<String, User>>,
    accounts: Mutex<HashMap<String, ConnectedAccount>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account directly, bypassing the flow.
    pub fn seed_account(&self, account: ConnectedAccount) {
        self.accounts.lock().unwrap().insert(account.id.clone(), account);
    }

    /// Snapshot an account for assertions.
    pub fn account(&self, account_id: &str) -> Option<ConnectedAccount> {
        self.accounts.lock().unwrap().get(account_id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_account(&self, account_id: &str) -> AuthResult<Option<ConnectedAccount>> {
        Ok(self.accounts.lock().unwrap().get(account_id).cloned())
    }

    async fn find_account_by_user(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> AuthResult<Option<ConnectedAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.user_id == user_id && a.provider == provider)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: &User) -> AuthResult<()> {
        self.users.lock().unwrap().insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn upsert_account(&self, account: &ConnectedAccount) -> AuthResult<()> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn update_account_tokens(
        &self,
        account_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: chrono::DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(account_id) {
            account.access_token = access_token.to_string();
            if let Some(rt) = refresh_token {
                account.refresh_token = Some(rt.to_string());
            }
            account.token_expires_at = expires_at;
        }
        Ok(())
    }

    async fn mark_account_revoked(&self, account_id: &str, sync_error: &str) -> AuthResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(account_id) {
            account.status = inboxflow_core::auth::model::AccountStatus::Revoked;
            account.sync_error = Some(sync_error.to_string());
        }
        Ok(())
    }
}

/// Build a token response for scripting provider behavior.
pub fn provider_tokens(
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in_secs: i64,
) -> ProviderTokens {
    ProviderTokens {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        token_type: "Bearer".to_string(),
        expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
        scope: None,
    }
}

/// Scripted `IdentityProvider`.
///
/// Responses are queued per operation; when a queue is empty the mock
/// falls back to a generic success so happy-path tests need no setup.
/// Call counters make single-flight assertions possible.
pub struct ScriptedProvider {
    provider: Provider,
    profile: Mutex<UserProfile>,
    exchange_results: Mutex<VecDeque<Result<ProviderTokens, ProviderError>>>,
    refresh_results: Mutex<VecDeque<Result<ProviderTokens, ProviderError>>>,
    refresh_delay: Mutex<Duration>,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Last `(state, challenge)` passed to `authorization_url`.
    pub last_authorization: Mutex<Option<(String, String)>>,
}

impl ScriptedProvider {
    pub fn new(provider: Provider) -> Arc<Self> {
        Arc::new(Self {
            provider,
            profile: Mutex::new(UserProfile {
                id: "prov-user-1".to_string(),
                email: "person@example.com".to_string(),
                name: Some("Test Person".to_string()),
                picture: None,
            }),
            exchange_results: Mutex::new(VecDeque::new()),
            refresh_results: Mutex::new(VecDeque::new()),
            refresh_delay: Mutex::new(Duration::ZERO),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
        })
    }

    pub fn set_profile(&self, profile: UserProfile) {
        *self.profile.lock().unwrap() = profile;
    }

    pub fn queue_exchange(&self, result: Result<ProviderTokens, ProviderError>) {
        self.exchange_results.lock().unwrap().push_back(result);
    }

    pub fn queue_refresh(&self, result: Result<ProviderTokens, ProviderError>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    /// Make each refresh call take this long, to widen contention
    /// windows in concurrency tests.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn refresh_call_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn next_refresh_number(&self) -> usize {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorization_url(&self, state: &str, challenge: &PkceChallenge) -> String {
        *self.last_authorization.lock().unwrap() =
            Some((state.to_string(), challenge.challenge.clone()));
        format!(
            "https://provider.test/authorize?state={state}&code_challenge={}",
            challenge.challenge
        )
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _verifier: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.exchange_results.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(provider_tokens("access-initial", Some("refresh-initial"), 3600)),
        }
    }

    async fn refresh_access_token(
        &self,
        _refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let n = self.next_refresh_number();
        let delay = *self.refresh_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.refresh_results.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(provider_tokens(&format!("access-refreshed-{n}"), None, 3600)),
        }
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<UserProfile, ProviderError> {
        Ok(self.profile.lock().unwrap().clone())
    }
}
