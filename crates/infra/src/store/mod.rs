//! Store adapters behind the core `EphemeralStateStore` port.

pub mod memory;
