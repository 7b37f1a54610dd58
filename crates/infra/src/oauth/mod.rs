//! Identity-provider adapters implementing the core `IdentityProvider`
//! port over HTTP.

pub mod client;
pub mod google;
pub mod microsoft;
