//! # Inboxflow Core
//!
//! Pure business logic for the OAuth credential lifecycle - no
//! infrastructure dependencies.
//!
//! This crate contains:
//! - Domain models (users, connected accounts, authorization state)
//! - Port/adapter interfaces (traits) for stores and identity providers
//! - The authorization flow, session issuance, and refresh coordination
//!   services
//!
//! ## Architecture Principles
//! - Only depends on `inboxflow-common`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

pub use auth::flow::AuthorizationFlow;
pub use auth::model::{
    account_id, refresh_lock_key, session_key, state_key, AccountStatus, AuthorizationState,
    ConnectedAccount, User,
};
pub use auth::ports::{CredentialStore, EphemeralStateStore, IdentityProvider};
pub use auth::refresh::RefreshCoordinator;
pub use auth::session::{SessionCredential, SessionIssuer};
