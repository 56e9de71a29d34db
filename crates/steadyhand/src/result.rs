//! Result and error types for Steadyhand.

use thiserror::Error;

use crate::executor::FailureClass;
use crate::session::SessionError;

/// Result type for Steadyhand operations
pub type SteadyResult<T> = Result<T, SteadyError>;

/// Errors surfaced to callers of Steadyhand
#[derive(Debug, Error)]
pub enum SteadyError {
    /// A condition never became ready within its budget
    #[error("Timed out after {elapsed_ms}ms (limit {timeout_ms}ms, {polls} polls) waiting for {description}{}", last_error_suffix(.last_error.as_ref()))]
    Timeout {
        /// What was waited for
        description: String,
        /// Configured budget
        timeout_ms: u64,
        /// Wall-clock time actually spent
        elapsed_ms: u64,
        /// Number of condition evaluations
        polls: u32,
        /// Last transient error the condition raised, if any
        #[source]
        last_error: Option<SessionError>,
    },

    /// A condition reported that it can never become ready
    #[error("Condition {description} failed: {reason}")]
    ConditionFailed {
        /// What was waited for
        description: String,
        /// Reason given by the condition
        reason: String,
    },

    /// A condition raised a non-retryable error (caller bug, e.g. malformed locator)
    #[error("Malformed condition {description}: {source}")]
    MalformedCondition {
        /// What was waited for
        description: String,
        /// The offending session error
        #[source]
        source: SessionError,
    },

    /// Wait timing parameters violate their invariants
    #[error("Invalid wait spec: {message}")]
    InvalidWaitSpec {
        /// Error message
        message: String,
    },

    /// Retry policy parameters violate their invariants
    #[error("Invalid retry policy: {message}")]
    InvalidRetryPolicy {
        /// Error message
        message: String,
    },

    /// A locator set was built from zero locators
    #[error("A locator set needs at least one locator")]
    EmptyLocatorSet,

    /// An interaction failed on every attempt the policy allowed
    #[error("{action} failed after {attempts} attempt(s) ({class}): {source}")]
    ActionExhausted {
        /// Action that was attempted
        action: String,
        /// Attempts used
        attempts: u32,
        /// Class of the last failure
        class: FailureClass,
        /// Last concrete error
        #[source]
        source: SessionError,
    },

    /// A selector catalog has no entry at the given path
    #[error("Selector not found: {path}")]
    SelectorNotFound {
        /// Dot-separated catalog path
        path: String,
    },

    /// A selector catalog entry is unusable
    #[error("Selector catalog error: {message}")]
    Catalog {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// A direct session call failed
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn last_error_suffix(last_error: Option<&SessionError>) -> String {
    last_error.map_or_else(String::new, |err| format!(" (last error: {err})"))
}

impl SteadyError {
    /// Whether this is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }
}
