//! Error taxonomy for the OAuth credential lifecycle.
//!
//! Every failure that crosses a module boundary is one of these
//! variants, and every variant has a fixed classification (retryable or
//! not, severity, suggested retry delay). Retry policy is decided from
//! the classification before an error propagates: grant revocation is
//! terminal and must never be auto-retried, while transient provider
//! failures are safe to retry with backoff.

use std::time::Duration;

use thiserror::Error;

/// Standard result type for the auth subsystem.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors produced by the OAuth credential lifecycle subsystem.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Authorization state missing or expired (CSRF/replay guard).
    #[error("invalid or expired authorization state")]
    InvalidState,

    /// Provider rejected the authorization-code exchange.
    #[error("authorization code exchange failed: {0}")]
    AuthExchange(String),

    /// Ciphertext failed authentication or was malformed. Fail closed:
    /// this is never downgraded to a warning on a token path.
    #[error("token decryption failed: {0}")]
    Decryption(String),

    /// No connected account record exists.
    #[error("no connected account: {0}")]
    NotConnected(String),

    /// The provider invalidated the grant; terminal until the user
    /// reconnects the account.
    #[error("account access revoked: {0}")]
    Revoked(String),

    /// Transient provider failure (network, rate limit); the account
    /// record was left untouched and a later call may retry.
    #[error("token refresh failed transiently: {message}")]
    TransientRefresh {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Gave up waiting for another instance's in-flight refresh.
    #[error("timed out waiting for token refresh")]
    RefreshTimeout,

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Ephemeral or durable store operation failed.
    #[error("store error: {0}")]
    Storage(String),

    /// Invariant violation that should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status the public surface maps this error onto.
    ///
    /// Crypto and internal failures deliberately collapse to a generic
    /// 500 so no key or ciphertext detail leaks to the caller.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidState | Self::AuthExchange(_) => 400,
            Self::NotConnected(_) => 404,
            Self::Revoked(_) => 403,
            Self::TransientRefresh { .. } | Self::RefreshTimeout => 503,
            Self::Decryption(_) | Self::Config(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }
}

/// Error classification trait for consistent retry and alerting
/// decisions across modules.
pub trait ErrorClassification {
    /// Check if this error is retryable.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention.
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable.
    fn retry_after(&self) -> Option<Duration>;
}

impl ErrorClassification for AuthError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientRefresh { .. } | Self::RefreshTimeout | Self::Storage(_)
        )
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidState | Self::NotConnected(_) => ErrorSeverity::Info,
            Self::AuthExchange(_)
            | Self::Revoked(_)
            | Self::TransientRefresh { .. }
            | Self::RefreshTimeout => ErrorSeverity::Warning,
            Self::Config(_) | Self::Storage(_) => ErrorSeverity::Error,
            Self::Decryption(_) | Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientRefresh { retry_after, .. } => *retry_after,
            Self::RefreshTimeout => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Error severity levels for monitoring and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization failed: {err}"))
    }
}
