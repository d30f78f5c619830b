//! Tracing subscriber setup for host binaries and tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber honoring `RUST_LOG`, defaulting to `info`
/// for this crate. Safe to call more than once; subsequent calls are
/// ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docchat_stream=info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
