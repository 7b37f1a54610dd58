//! Foundation utilities shared across Inboxflow crates.
//!
//! This crate carries no business logic. It provides:
//! - `error`: the shared error taxonomy and classification surface
//! - `crypto`: authenticated encryption for tokens at rest
//! - `auth`: OAuth wire types and PKCE primitives
//! - `config`: environment-backed settings for the auth subsystem
//! - `observability`: tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod observability;

// Re-export commonly used types for convenience
pub use auth::types::{
    ClientFingerprint, OAuthErrorBody, Provider, ProviderError, ProviderTokens, TokenResponse,
    UserProfile,
};
pub use config::{AuthSettings, ProviderEndpoints, ProviderSettings};
pub use crypto::TokenCipher;
pub use error::{AuthError, AuthResult, ErrorClassification, ErrorSeverity};
