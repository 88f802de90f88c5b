//! Logging Initialization
//!
//! Thin wrapper over `env_logger` so every entry point (binary, tests,
//! batch jobs) configures logging the same way. Respects `RUST_LOG`;
//! defaults to `info` for this crate and `warn` for dependencies.

use std::sync::OnceLock;

use env_logger::Env;

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the global logger. Safe to call more than once; only the
/// first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("warn,fableweaver=info"))
            .format_timestamp_millis()
            .init();
    });
}
