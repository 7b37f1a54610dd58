//! OAuth wire types shared by the flow, refresh, and provider layers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gmail,
    Outlook,
}

impl Provider {
    /// Stable lowercase name, used in account ids and log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gmail" | "google" => Ok(Self::Gmail),
            "outlook" | "microsoft" => Ok(Self::Outlook),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Request context captured when an authorization flow begins, compared
/// against the callback request as an anomaly signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFingerprint {
    pub ip_address: String,
    pub user_agent: String,
}

/// Raw token response body from a provider's token endpoint.
///
/// Field names follow RFC 6749 so this deserializes directly from the
/// wire.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token material with the relative `expires_in` resolved to an
/// absolute instant at receipt time.
#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    /// Absent when the provider chose not to rotate; callers must keep
    /// the previously stored refresh token in that case.
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl From<TokenResponse> for ProviderTokens {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            token_type: resp.token_type,
            expires_at: Utc::now() + chrono::Duration::seconds(resp.expires_in),
            scope: resp.scope,
        }
    }
}

/// RFC 6749 error body returned by token endpoints on 4xx.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorBody {
    /// Whether this error means the grant itself is dead (revoked,
    /// expired, or consent withdrawn) rather than the request being
    /// transiently unserviceable.
    #[must_use]
    pub fn is_grant_invalid(&self) -> bool {
        if self.error == "invalid_grant" {
            return true;
        }
        self.error_description
            .as_deref()
            .is_some_and(|d| d.to_ascii_lowercase().contains("revoked"))
    }

    /// One-line rendering for error messages and logs.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.error_description {
            Some(desc) => format!("{}: {desc}", self.error),
            None => self.error.clone(),
        }
    }
}

/// Failures reported by identity-provider adapters.
///
/// Classification happens at the adapter boundary, where the HTTP
/// status and error body are still in hand; callers upstream only
/// branch on the variant.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The grant is permanently dead. Retrying cannot help; the user
    /// must reconnect.
    #[error("grant invalid: {0}")]
    GrantInvalid(String),

    /// Network failure, 5xx, or rate limiting. Stored credentials are
    /// still presumed valid.
    #[error("transient provider failure: {message}")]
    Transient {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The provider answered but the response violated the protocol
    /// (unexpected status, undecodable body).
    #[error("provider protocol error: {0}")]
    Protocol(String),
}

/// Identity attributes fetched from the provider's profile endpoint
/// after a successful code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider-scoped subject identifier.
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for OAuth wire types.
    use super::*;

    /// Validates `TokenResponse` behavior for the wire deserialization
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a full Google-style body deserializes.
    /// - Confirms a refresh response without `refresh_token` leaves the
    ///   field `None`.
    #[test]
    fn test_token_response_deserialization() {
        let full: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "ya29.abc",
                "refresh_token": "1//xyz",
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": "openid email"
            }"#,
        )
        .unwrap();
        assert_eq!(full.access_token, "ya29.abc");
        assert_eq!(full.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(full.expires_in, 3599);

        let no_rotate: TokenResponse =
            serde_json::from_str(r#"{"access_token": "ya29.new", "expires_in": 3600}"#).unwrap();
        assert!(no_rotate.refresh_token.is_none());
        assert_eq!(no_rotate.token_type, "Bearer");
    }

    /// Validates `ProviderTokens::from` behavior for the absolute
    /// expiry scenario.
    ///
    /// Assertions:
    /// - Confirms `expires_at` lands within a sane window around
    ///   now + expires_in.
    #[test]
    fn test_expires_in_resolved_to_instant() {
        let resp = TokenResponse {
            access_token: "tok".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_in: 3600,
            scope: None,
        };
        let tokens = ProviderTokens::from(resp);

        let lower = Utc::now() + chrono::Duration::seconds(3590);
        let upper = Utc::now() + chrono::Duration::seconds(3610);
        assert!(tokens.expires_at > lower && tokens.expires_at < upper);
    }

    /// Validates `OAuthErrorBody::is_grant_invalid` behavior for the
    /// revocation classification scenario.
    ///
    /// Assertions:
    /// - Ensures `invalid_grant` is terminal.
    /// - Ensures a description mentioning revocation is terminal.
    /// - Ensures other errors are not classified as grant-invalid.
    #[test]
    fn test_grant_invalid_classification() {
        let invalid_grant = OAuthErrorBody {
            error: "invalid_grant".into(),
            error_description: Some("Token has been expired or revoked.".into()),
        };
        assert!(invalid_grant.is_grant_invalid());

        let revoked_desc = OAuthErrorBody {
            error: "invalid_request".into(),
            error_description: Some("Access was Revoked by the user".into()),
        };
        assert!(revoked_desc.is_grant_invalid());

        let rate_limited = OAuthErrorBody {
            error: "temporarily_unavailable".into(),
            error_description: None,
        };
        assert!(!rate_limited.is_grant_invalid());
    }

    /// Validates `Provider` behavior for the naming scenario.
    ///
    /// Assertions:
    /// - Confirms serde and Display both use the lowercase name.
    /// - Confirms parsing accepts provider aliases.
    #[test]
    fn test_provider_naming() {
        assert_eq!(serde_json::to_string(&Provider::Gmail).unwrap(), "\"gmail\"");
        assert_eq!(Provider::Outlook.to_string(), "outlook");
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Gmail);
        assert_eq!("microsoft".parse::<Provider>().unwrap(), Provider::Outlook);
        assert!("yahoo".parse::<Provider>().is_err());
    }
}
