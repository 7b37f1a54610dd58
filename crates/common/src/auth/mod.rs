//! OAuth wire types and PKCE primitives.

pub mod pkce;
pub mod types;

pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state_token, PkceChallenge};
pub use types::{
    ClientFingerprint, OAuthErrorBody, Provider, ProviderError, ProviderTokens, TokenResponse,
    UserProfile,
};
