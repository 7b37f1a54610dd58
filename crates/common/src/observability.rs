//! Tracing subscriber setup.
//!
//! Binaries and integration harnesses call [`init_tracing`] once at
//! startup. Log filtering comes from `RUST_LOG` (default `info`), and
//! `LOG_FORMAT=json` switches to structured JSON output for log
//! shippers.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops so test
/// binaries can initialize defensively.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let result = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    // Already initialized by another component; keep the existing one.
    let _ = result;
}
