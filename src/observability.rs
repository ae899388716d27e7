//! Structured logging setup.
//!
//! The engine itself only emits `tracing` events. Hosts that do not install
//! their own subscriber can call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` overrides the configured `log_level`. Production emits JSON
/// lines; other environments use the human-readable format.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(
    config: &EngineConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .json()
            .flatten_event(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init()
    }
}
