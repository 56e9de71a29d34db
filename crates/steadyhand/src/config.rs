//! Synchronization configuration
//!
//! Sources, lowest to highest priority:
//!
//! 1. built-in defaults
//! 2. a YAML file (`from_file` / `from_yaml_str`)
//! 3. `STEADYHAND_*` environment variables (`apply_env`)
//!
//! The library only reads configuration; nothing here is global.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::executor::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::result::{SteadyError, SteadyResult};
use crate::settled::{DEFAULT_LOADING_INDICATORS, PENDING_REQUESTS_SCRIPT};
use crate::stability::DEFAULT_QUIET_PERIOD_MS;
use crate::wait::{
    WaitSpec, DEFAULT_EXPLICIT_TIMEOUT_MS, DEFAULT_PAGE_LOAD_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
};

/// Default script timeout (20 seconds)
pub const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 20_000;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "STEADYHAND_";

// =============================================================================
// SECTIONS
// =============================================================================

/// Retry defaults for the action executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per action
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Settled-detector heuristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleSettings {
    /// CSS selectors of loading indicators
    pub loading_indicators: Vec<String>,
    /// Script returning the pending-request count, or `null`
    pub pending_requests_script: String,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            loading_indicators: DEFAULT_LOADING_INDICATORS
                .iter()
                .map(ToString::to_string)
                .collect(),
            pending_requests_script: PENDING_REQUESTS_SCRIPT.to_string(),
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `steadyhand=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// =============================================================================
// SYNC CONFIG
// =============================================================================

/// Timeouts, intervals and policies consumed by waiters and executors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Explicit-wait timeout
    pub explicit_timeout_ms: u64,
    /// Page-load timeout
    pub page_load_timeout_ms: u64,
    /// Script timeout, handed to session adapters
    pub script_timeout_ms: u64,
    /// Poll interval of every wait
    pub poll_interval_ms: u64,
    /// Default quiet period of the stability waiter
    pub stability_quiet_ms: u64,
    /// Executor retry defaults
    pub retry: RetrySettings,
    /// Settled-detector heuristics
    pub settle: SettleSettings,
    /// Logging
    pub log: LogConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            explicit_timeout_ms: DEFAULT_EXPLICIT_TIMEOUT_MS,
            page_load_timeout_ms: DEFAULT_PAGE_LOAD_TIMEOUT_MS,
            script_timeout_ms: DEFAULT_SCRIPT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stability_quiet_ms: DEFAULT_QUIET_PERIOD_MS,
            retry: RetrySettings::default(),
            settle: SettleSettings::default(),
            log: LogConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse YAML; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::Config`] on malformed YAML.
    pub fn from_yaml_str(yaml: &str) -> SteadyResult<Self> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| SteadyError::config(format!("Failed to parse config: {e}")))
    }

    /// Read and parse a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::Config`] when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> SteadyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SteadyError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> SteadyResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults, then the optional file, then the environment; validated
    pub fn load(path: Option<&Path>) -> SteadyResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `STEADYHAND_*` overrides from the process environment
    pub fn apply_env(&mut self) -> SteadyResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::Config`] naming the first unparsable variable.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> SteadyResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("EXPLICIT_TIMEOUT_MS") {
            self.explicit_timeout_ms = parse_number("EXPLICIT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("PAGE_LOAD_TIMEOUT_MS") {
            self.page_load_timeout_ms = parse_number("PAGE_LOAD_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("SCRIPT_TIMEOUT_MS") {
            self.script_timeout_ms = parse_number("SCRIPT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = var("STABILITY_QUIET_MS") {
            self.stability_quiet_ms = parse_number("STABILITY_QUIET_MS", &v)?;
        }
        if let Some(v) = var("RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_number("RETRY_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = var("RETRY_DELAY_MS") {
            self.retry.delay_ms = parse_number("RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = var("LOADING_INDICATORS") {
            self.settle.loading_indicators = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = var("LOG_JSON") {
            self.log.json = v
                .trim()
                .parse()
                .map_err(|_| SteadyError::config(format!("Invalid {ENV_PREFIX}LOG_JSON: {v}")))?;
        }
        Ok(())
    }

    /// Check cross-field invariants
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::Config`] describing the first violation.
    pub fn validate(&self) -> SteadyResult<()> {
        WaitSpec::new(self.explicit_timeout_ms, self.poll_interval_ms)
            .map_err(|e| SteadyError::config(format!("explicit wait: {e}")))?;
        WaitSpec::new(self.page_load_timeout_ms, self.poll_interval_ms)
            .map_err(|e| SteadyError::config(format!("page load wait: {e}")))?;
        if self.script_timeout_ms == 0 {
            return Err(SteadyError::config("script_timeout_ms must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(SteadyError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> SteadyResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SteadyError::config(format!("Invalid {ENV_PREFIX}{name}: {value}")))
}
