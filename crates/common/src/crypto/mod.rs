//! Authenticated encryption for provider tokens at rest.

mod cipher;

pub use cipher::TokenCipher;
