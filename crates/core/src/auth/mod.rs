//! OAuth credential lifecycle: authorization flow, session issuance,
//! and coordinated token refresh.

pub mod flow;
pub mod model;
pub mod ports;
pub mod refresh;
pub mod session;
