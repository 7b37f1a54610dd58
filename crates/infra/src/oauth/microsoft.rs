//! Microsoft identity platform adapter (Outlook accounts).

use async_trait::async_trait;
use inboxflow_common::auth::pkce::PkceChallenge;
use inboxflow_common::auth::types::{Provider, ProviderError, ProviderTokens, UserProfile};
use inboxflow_common::config::ProviderSettings;
use inboxflow_common::error::AuthResult;
use inboxflow_core::auth::ports::IdentityProvider;
use serde::Deserialize;

use super::client::OAuthHttpClient;

/// Microsoft Graph `/me` response.
///
/// `mail` is null for accounts without a provisioned mailbox; the
/// user principal name is the documented fallback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphProfile {
    id: String,
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// `IdentityProvider` for Microsoft accounts.
#[derive(Debug, Clone)]
pub struct MicrosoftOAuthProvider {
    client: OAuthHttpClient,
}

impl MicrosoftOAuthProvider {
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        Self { client: OAuthHttpClient::new(settings) }
    }

    /// Build from `MICROSOFT_*` environment variables.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if a required variable is missing.
    pub fn from_env() -> AuthResult<Self> {
        Ok(Self::new(ProviderSettings::from_env(Provider::Outlook)?))
    }
}

#[async_trait]
impl IdentityProvider for MicrosoftOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Outlook
    }

    fn authorization_url(&self, state: &str, challenge: &PkceChallenge) -> String {
        // Refresh tokens come from the offline_access scope, already in
        // the configured scope list; response_mode keeps the callback
        // parameters in the query string.
        self.client
            .authorization_url(state, challenge, &[("response_mode", "query")])
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
        let profile: GraphProfile = self
            .client
            .get_json(&self.client.settings().endpoints.profile_url, access_token)
            .await?;

        let email = profile
            .mail
            .or(profile.user_principal_name)
            .ok_or_else(|| {
                ProviderError::Protocol("profile has neither mail nor userPrincipalName".into())
            })?;

        Ok(UserProfile { id: profile.id, email, name: profile.display_name, picture: None })
    }
}
