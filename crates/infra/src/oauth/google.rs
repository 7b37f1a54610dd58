//! Google OAuth adapter (Gmail accounts).

use async_trait::async_trait;
use inboxflow_common::auth::pkce::PkceChallenge;
use inboxflow_common::auth::types::{Provider, ProviderError, ProviderTokens, UserProfile};
use inboxflow_common::config::ProviderSettings;
use inboxflow_common::error::AuthResult;
use inboxflow_core::auth::ports::IdentityProvider;
use serde::Deserialize;

use super::client::OAuthHttpClient;

/// Google `oauth2/v2/userinfo` response.
#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// `IdentityProvider` for Google accounts.
#[derive(Debug, Clone)]
pub struct GoogleOAuthProvider {
    client: OAuthHttpClient,
}

impl GoogleOAuthProvider {
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        Self { client: OAuthHttpClient::new(settings) }
    }

    /// Build from `GOOGLE_*` environment variables.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if a required variable is missing.
    pub fn from_env() -> AuthResult<Self> {
        Ok(Self::new(ProviderSettings::from_env(Provider::Gmail)?))
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Gmail
    }

    fn authorization_url(&self, state: &str, challenge: &PkceChallenge) -> String {
        // offline + consent so Google issues a refresh token even for
        // users who already granted the scopes once.
        self.client.authorization_url(
            state,
            challenge,
            &[("access_type", "offline"), ("prompt", "consent")],
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        self.client.exchange_code(code, verifier).await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        self.client.refresh_access_token(refresh_token).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let profile: GoogleProfile = self
            .client
            .get_json(&self.client.settings().endpoints.profile_url, access_token)
            .await?;

        Ok(UserProfile {
            id: profile.id,
            email: profile.email,
            name: profile.name,
            picture: profile.picture,
        })
    }
}
