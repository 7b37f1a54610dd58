//! Environment-backed configuration for the auth subsystem.
//!
//! All tunables ship with production defaults and can be overridden per
//! environment; only credentials (encryption key, provider client
//! secrets) are required with no fallback.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::warn;

use crate::auth::types::Provider;
use crate::crypto::TokenCipher;
use crate::error::{AuthError, AuthResult};

/// Provider endpoint URLs.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub profile_url: String,
}

impl ProviderEndpoints {
    /// Google OAuth 2.0 endpoints.
    #[must_use]
    pub fn google() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            profile_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }

    /// Microsoft identity platform endpoints (common tenant).
    #[must_use]
    pub fn microsoft() -> Self {
        Self {
            auth_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize".to_string(),
            token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token".to_string(),
            profile_url: "https://graph.microsoft.com/v1.0/me".to_string(),
        }
    }

    /// Default endpoints for a provider.
    #[must_use]
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Gmail => Self::google(),
            Provider::Outlook => Self::microsoft(),
        }
    }
}

/// Registered OAuth application settings for one provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub endpoints: ProviderEndpoints,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl ProviderSettings {
    /// Load settings for one provider from `{PREFIX}_CLIENT_ID`,
    /// `{PREFIX}_CLIENT_SECRET`, `{PREFIX}_REDIRECT_URI` where the
    /// prefix is `GOOGLE` or `MICROSOFT`.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if a required variable is missing.
    pub fn from_env(provider: Provider) -> AuthResult<Self> {
        let prefix = match provider {
            Provider::Gmail => "GOOGLE",
            Provider::Outlook => "MICROSOFT",
        };

        let scopes = match provider {
            Provider::Gmail => vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
                "https://www.googleapis.com/auth/gmail.modify".to_string(),
            ],
            Provider::Outlook => vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
                "offline_access".to_string(),
                "https://graph.microsoft.com/Mail.ReadWrite".to_string(),
            ],
        };

        Ok(Self {
            client_id: env_var(&format!("{prefix}_CLIENT_ID"))?,
            client_secret: env_var(&format!("{prefix}_CLIENT_SECRET"))?,
            redirect_uri: env_var(&format!("{prefix}_REDIRECT_URI"))?,
            scopes,
            endpoints: ProviderEndpoints::for_provider(provider),
        })
    }
}

/// Tunables for the credential lifecycle.
#[derive(Clone)]
pub struct AuthSettings {
    /// Base64url-encoded 32-byte key for token encryption at rest.
    pub token_encryption_key: String,
    /// How long a pending authorization state lives before the callback
    /// is rejected.
    pub state_ttl: Duration,
    /// Window before expiry inside which an access token is treated as
    /// stale and refreshed.
    pub near_expiry_window: Duration,
    /// TTL of the per-account refresh lock; bounds how long a crashed
    /// holder can block others.
    pub lock_ttl: Duration,
    /// Poll interval while waiting on another holder's refresh.
    pub lock_wait_interval: Duration,
    /// Number of polls before giving up on the other holder.
    pub lock_wait_attempts: u32,
    /// Lifetime of issued session credentials.
    pub session_ttl: Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token_encryption_key", &"[REDACTED]")
            .field("state_ttl", &self.state_ttl)
            .field("near_expiry_window", &self.near_expiry_window)
            .field("lock_ttl", &self.lock_ttl)
            .field("lock_wait_interval", &self.lock_wait_interval)
            .field("lock_wait_attempts", &self.lock_wait_attempts)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl AuthSettings {
    /// Load settings from the environment, reading `.env` first if one
    /// is present.
    ///
    /// `TOKEN_ENCRYPTION_KEY` is required; the process must not start
    /// with an implicit or generated key in a real deployment. Setting
    /// `AUTH_ALLOW_EPHEMERAL_KEY=1` opts into a generated key for local
    /// development, with a loud warning: every stored token becomes
    /// undecryptable at the next restart.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the key is missing or a tunable
    /// fails to parse.
    pub fn from_env() -> AuthResult<Self> {
        dotenvy::dotenv().ok();

        let token_encryption_key = match std::env::var("TOKEN_ENCRYPTION_KEY") {
            Ok(key) => key,
            Err(_) if env_bool("AUTH_ALLOW_EPHEMERAL_KEY", false) => {
                warn!(
                    "TOKEN_ENCRYPTION_KEY not set; generated an ephemeral key. \
                     Stored tokens will not survive a restart. Never run production this way."
                );
                URL_SAFE_NO_PAD.encode(TokenCipher::generate_key())
            }
            Err(_) => {
                return Err(AuthError::Config(
                    "missing required environment variable: TOKEN_ENCRYPTION_KEY".to_string(),
                ))
            }
        };

        Ok(Self {
            token_encryption_key,
            state_ttl: env_duration_secs("AUTH_STATE_TTL_SECONDS", 600)?,
            near_expiry_window: env_duration_secs("TOKEN_NEAR_EXPIRY_SECONDS", 300)?,
            lock_ttl: env_duration_secs("REFRESH_LOCK_TTL_SECONDS", 30)?,
            lock_wait_interval: Duration::from_millis(env_u64("REFRESH_LOCK_WAIT_MS", 200)?),
            lock_wait_attempts: u32::try_from(env_u64("REFRESH_LOCK_WAIT_ATTEMPTS", 10)?)
                .map_err(|_| AuthError::Config("REFRESH_LOCK_WAIT_ATTEMPTS too large".into()))?,
            session_ttl: env_duration_secs("SESSION_TTL_SECONDS", 86_400)?,
        })
    }

    /// Settings with production defaults and the given key, for wiring
    /// up tests and tools without touching the process environment.
    #[must_use]
    pub fn with_key(token_encryption_key: impl Into<String>) -> Self {
        Self {
            token_encryption_key: token_encryption_key.into(),
            state_ttl: Duration::from_secs(600),
            near_expiry_window: Duration::from_secs(300),
            lock_ttl: Duration::from_secs(30),
            lock_wait_interval: Duration::from_millis(200),
            lock_wait_attempts: 10,
            session_ttl: Duration::from_secs(86_400),
        }
    }
}

/// Get required environment variable.
///
/// # Errors
/// Returns `AuthError::Config` if the variable is not set.
fn env_var(key: &str) -> AuthResult<String> {
    std::env::var(key)
        .map_err(|_| AuthError::Config(format!("missing required environment variable: {key}")))
}

/// Parse a boolean from the environment. Accepts `1`/`true`/`yes`/`on`
/// (case-insensitive); anything else is false.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> AuthResult<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AuthError::Config(format!("{key} must be an integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_duration_secs(key: &str, default: u64) -> AuthResult<Duration> {
    Ok(Duration::from_secs(env_u64(key, default)?))
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration loading.
    use std::sync::Mutex;

    use super::*;

    // Process environment is global; serialize the tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Validates `AuthSettings::with_key` behavior for the default
    /// tunables scenario.
    ///
    /// Assertions:
    /// - Confirms the documented defaults for every tunable.
    #[test]
    fn test_default_tunables() {
        let settings = AuthSettings::with_key("k");
        assert_eq!(settings.state_ttl, Duration::from_secs(600));
        assert_eq!(settings.near_expiry_window, Duration::from_secs(300));
        assert_eq!(settings.lock_ttl, Duration::from_secs(30));
        assert_eq!(settings.lock_wait_interval, Duration::from_millis(200));
        assert_eq!(settings.lock_wait_attempts, 10);
        assert_eq!(settings.session_ttl, Duration::from_secs(86_400));
    }

    /// Validates `AuthSettings::from_env` behavior for the missing key
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a missing `TOKEN_ENCRYPTION_KEY` is a `Config` error
    ///   naming the variable.
    #[test]
    fn test_missing_encryption_key_is_fatal() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::remove_var("TOKEN_ENCRYPTION_KEY");
        std::env::remove_var("AUTH_ALLOW_EPHEMERAL_KEY");

        let err = AuthSettings::from_env().unwrap_err();
        assert!(matches!(&err, AuthError::Config(msg) if msg.contains("TOKEN_ENCRYPTION_KEY")));
    }

    /// Validates `AuthSettings::from_env` behavior for the ephemeral
    /// key opt-in scenario.
    ///
    /// Assertions:
    /// - Confirms `AUTH_ALLOW_EPHEMERAL_KEY=1` yields a generated key
    ///   that actually constructs a working cipher.
    #[test]
    fn test_ephemeral_key_opt_in() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::remove_var("TOKEN_ENCRYPTION_KEY");
        std::env::set_var("AUTH_ALLOW_EPHEMERAL_KEY", "1");

        let settings = AuthSettings::from_env().expect("ephemeral key");
        assert!(TokenCipher::from_base64_key(&settings.token_encryption_key).is_ok());

        std::env::remove_var("AUTH_ALLOW_EPHEMERAL_KEY");
    }

    /// Validates `AuthSettings::from_env` behavior for the override
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms environment overrides replace the defaults.
    /// - Ensures a non-numeric override is a `Config` error.
    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::set_var("TOKEN_ENCRYPTION_KEY", "dGVzdA");
        std::env::set_var("AUTH_STATE_TTL_SECONDS", "120");

        let settings = AuthSettings::from_env().expect("settings load");
        assert_eq!(settings.state_ttl, Duration::from_secs(120));

        std::env::set_var("AUTH_STATE_TTL_SECONDS", "soon");
        assert!(AuthSettings::from_env().is_err());

        std::env::remove_var("AUTH_STATE_TTL_SECONDS");
        std::env::remove_var("TOKEN_ENCRYPTION_KEY");
    }

    /// Validates `ProviderSettings` behavior for the secret redaction
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `Debug` output never contains the client secret.
    #[test]
    fn test_debug_redacts_secret() {
        let settings = ProviderSettings {
            client_id: "id".into(),
            client_secret: "super-secret".into(),
            redirect_uri: "https://app.example.com/callback".into(),
            scopes: vec!["email".into()],
            endpoints: ProviderEndpoints::google(),
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
