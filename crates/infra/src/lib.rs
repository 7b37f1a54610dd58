//! # Inboxflow Infra
//!
//! Adapters behind the core ports: reqwest-based identity-provider
//! clients for Google and Microsoft, and an in-memory TTL store for
//! tests and single-instance deployments.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod oauth;
pub mod store;

pub use oauth::google::GoogleOAuthProvider;
pub use oauth::microsoft::MicrosoftOAuthProvider;
pub use store::memory::InMemoryTtlStore;
