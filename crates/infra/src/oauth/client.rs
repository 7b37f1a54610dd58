//! Shared HTTP plumbing for the provider adapters.
//!
//! Both adapters speak the same RFC 6749 dialect: form-encoded POSTs to
//! the token endpoint, JSON responses, JSON error bodies on 4xx. The
//! classification into grant-invalid / transient / protocol happens
//! here, where the HTTP status and error body are still in hand.

use std::time::Duration;

use inboxflow_common::auth::pkce::PkceChallenge;
use inboxflow_common::auth::types::{OAuthErrorBody, ProviderError, ProviderTokens, TokenResponse};
use inboxflow_common::config::ProviderSettings;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin reqwest wrapper bound to one provider's registered application.
#[derive(Debug, Clone)]
pub struct OAuthHttpClient {
    settings: ProviderSettings,
    http: Client,
}

impl OAuthHttpClient {
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { settings, http }
    }

    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Build the authorization URL carrying state, PKCE challenge, and
    /// any provider-specific extra parameters.
    #[must_use]
    pub fn authorization_url(
        &self,
        state: &str,
        challenge: &PkceChallenge,
        extra_params: &[(&str, &str)],
    ) -> String {
        let scope = self.settings.scopes.join(" ");
        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", &self.settings.client_id),
            ("redirect_uri", &self.settings.redirect_uri),
            ("scope", &scope),
            ("state", state),
            ("code_challenge", &challenge.challenge),
            ("code_challenge_method", challenge.method),
        ];
        params.extend_from_slice(extra_params);

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.settings.endpoints.auth_url, query)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("client_id", &self.settings.client_id),
            ("client_secret", &self.settings.client_secret),
            ("code", code),
            ("redirect_uri", &self.settings.redirect_uri),
            ("code_verifier", verifier),
        ];
        self.post_token_request(&params).await
    }

    /// Obtain a fresh access token from a refresh token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let params: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("client_id", &self.settings.client_id),
            ("client_secret", &self.settings.client_secret),
            ("refresh_token", refresh_token),
        ];
        self.post_token_request(&params).await
    }

    /// GET a JSON document with a bearer token (profile endpoints).
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Protocol(format!("undecodable response body: {e}")))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<ProviderTokens, ProviderError> {
        let response = self
            .http
            .post(&self.settings.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol(format!("undecodable token response: {e}")))?;

        debug!(token_url = %self.settings.endpoints.token_url, "token endpoint call succeeded");

        Ok(token_response.into())
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Transient { message: format!("request failed: {err}"), retry_after: None }
}

/// Map a non-2xx token/profile response into the error taxonomy.
///
/// 5xx and 429 are transient; 4xx is inspected for the RFC 6749 error
/// body and becomes grant-invalid when the body says the grant is dead.
async fn classify_failure(status: StatusCode, response: Response) -> ProviderError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        return ProviderError::Transient {
            message: format!("provider returned {status}"),
            retry_after,
        };
    }

    let body = response.text().await.unwrap_or_default();
    let error_body: OAuthErrorBody = serde_json::from_str(&body).unwrap_or_default();

    if error_body.is_grant_invalid() {
        ProviderError::GrantInvalid(error_body.summary())
    } else if error_body.error.is_empty() {
        ProviderError::Protocol(format!("provider returned {status}: {body}"))
    } else {
        ProviderError::Protocol(error_body.summary())
    }
}
