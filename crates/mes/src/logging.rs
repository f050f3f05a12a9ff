//! Process-wide `tracing` setup shared by `mesd` and `mesctl`.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once.
///
/// The filter comes from `MES_LOG`, then `RUST_LOG`, then `info`.
/// `MES_LOG_FORMAT=json` switches to one JSON object per line.
pub fn init() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let directives = std::env::var("MES_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

        let json = std::env::var("MES_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let result = if json {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .json()
                .try_init()
        } else {
            fmt().with_env_filter(filter).with_target(true).try_init()
        };

        // A subscriber may already be installed (tests, embedding); keep it.
        if result.is_err() {
            tracing::debug!("global tracing subscriber already set");
        }
    });
}
