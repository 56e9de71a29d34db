//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; test binaries and
//! harnesses call [`init_logging`] once to see them.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::result::{SteadyError, SteadyResult};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` overrides `config.level`. Returns `false` when a global
/// subscriber was already installed, so repeated calls are harmless.
///
/// # Errors
///
/// Returns [`SteadyError::Config`] for an unparsable filter directive.
pub fn init_logging(config: &LogConfig) -> SteadyResult<bool> {
    let filter = build_filter(&config.level, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;
    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };
    Ok(installed)
}

fn build_filter(level: &str, env_override: Option<String>) -> SteadyResult<EnvFilter> {
    let directives = env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(&directives)
        .map_err(|e| SteadyError::config(format!("Invalid log filter {directives:?}: {e}")))
}
