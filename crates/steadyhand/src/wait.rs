//! Condition Poller
//!
//! The single polling primitive every wait in the crate composes.
//!
//! ## Semantics
//!
//! - A condition is evaluated at least once.
//! - `Ready` returns immediately, without a trailing sleep.
//! - `Failed` and non-retryable session errors abort immediately.
//! - Any other session error counts as `Pending`, is remembered, and is
//!   surfaced with the timeout if the condition never becomes ready.
//! - Between evaluations the thread sleeps `min(poll_interval, remaining)`,
//!   so a timeout of `T` fires within `[T, T + poll_interval]`.
//! - Time is measured with [`Instant`], a monotonic clock.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::config::SyncConfig;
use crate::result::{SteadyError, SteadyResult};
use crate::session::{AutomationSession, SessionError};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default explicit-wait timeout (15 seconds)
pub const DEFAULT_EXPLICIT_TIMEOUT_MS: u64 = 15_000;

/// Default page-load timeout (30 seconds)
pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// POLL
// =============================================================================

/// State of a condition at one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// Not there yet, ask again later
    Pending,
    /// Satisfied, carrying the produced value
    Ready(T),
    /// Can never be satisfied
    Failed(String),
}

impl<T> Poll<T> {
    /// `Ready(value)` when `ready` holds, `Pending` otherwise
    pub fn ready_if(ready: bool, value: impl FnOnce() -> T) -> Self {
        if ready {
            Self::Ready(value())
        } else {
            Self::Pending
        }
    }

    /// Whether this is `Ready`
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether this is `Pending`
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

// =============================================================================
// CONDITION TRAIT
// =============================================================================

/// A repeatedly evaluated predicate over session state.
///
/// Evaluation must be safe to repeat any number of times.
pub trait Condition<T> {
    /// Evaluate once against the session
    fn evaluate(&self, session: &dyn AutomationSession) -> Result<Poll<T>, SessionError>;

    /// Human-readable description used in errors and logs
    fn description(&self) -> String;
}

/// A closure-based condition
pub struct FnCondition<F> {
    func: F,
    description: String,
}

impl<F> std::fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F> FnCondition<F> {
    /// Create a new closure condition
    pub fn new<T>(description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&dyn AutomationSession) -> Result<Poll<T>, SessionError>,
    {
        Self {
            func,
            description: description.into(),
        }
    }
}

impl<T, F> Condition<T> for FnCondition<F>
where
    F: Fn(&dyn AutomationSession) -> Result<Poll<T>, SessionError>,
{
    fn evaluate(&self, session: &dyn AutomationSession) -> Result<Poll<T>, SessionError> {
        (self.func)(session)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

// =============================================================================
// WAIT SPEC
// =============================================================================

/// Timing of one wait: wall-clock budget and poll interval.
///
/// `1 <= poll_interval_ms <= timeout_ms` holds for every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitSpec {
    timeout_ms: u64,
    poll_interval_ms: u64,
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_EXPLICIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitSpec {
    /// Create a wait spec.
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::InvalidWaitSpec`] when the poll interval is
    /// zero or longer than the timeout.
    pub fn new(timeout_ms: u64, poll_interval_ms: u64) -> SteadyResult<Self> {
        if poll_interval_ms == 0 {
            return Err(SteadyError::InvalidWaitSpec {
                message: "poll interval must be at least 1ms".to_string(),
            });
        }
        if poll_interval_ms > timeout_ms {
            return Err(SteadyError::InvalidWaitSpec {
                message: format!(
                    "poll interval {poll_interval_ms}ms exceeds timeout {timeout_ms}ms"
                ),
            });
        }
        Ok(Self {
            timeout_ms,
            poll_interval_ms,
        })
    }

    /// Explicit-wait timing from configuration
    ///
    /// # Errors
    ///
    /// Propagates [`WaitSpec::new`] validation.
    pub fn from_config(config: &SyncConfig) -> SteadyResult<Self> {
        Self::new(config.explicit_timeout_ms, config.poll_interval_ms)
    }

    /// Same poll interval, different timeout.
    ///
    /// The poll interval is clamped to the new timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::InvalidWaitSpec`] for a zero timeout.
    pub fn with_timeout(self, timeout_ms: u64) -> SteadyResult<Self> {
        Self::new(timeout_ms, self.poll_interval_ms.min(timeout_ms))
    }

    /// Timeout in milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Poll interval in milliseconds
    #[must_use]
    pub const fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    /// Timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// A satisfied wait with its statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome<T> {
    /// Value produced by the condition
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of evaluations, including the successful one
    pub polls: u32,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls conditions against one borrowed session
#[derive(Clone, Copy)]
pub struct Waiter<'s> {
    session: &'s dyn AutomationSession,
    spec: WaitSpec,
}

impl std::fmt::Debug for Waiter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl<'s> Waiter<'s> {
    /// Create a waiter with default timing
    #[must_use]
    pub fn new(session: &'s dyn AutomationSession) -> Self {
        Self::with_spec(session, WaitSpec::default())
    }

    /// Create a waiter with explicit timing
    #[must_use]
    pub fn with_spec(session: &'s dyn AutomationSession, spec: WaitSpec) -> Self {
        Self { session, spec }
    }

    /// Timing used by this waiter
    #[must_use]
    pub const fn spec(&self) -> WaitSpec {
        self.spec
    }

    /// The borrowed session
    #[must_use]
    pub fn session(&self) -> &'s dyn AutomationSession {
        self.session
    }

    /// Block until the condition is ready and return its value.
    ///
    /// # Errors
    ///
    /// - [`SteadyError::Timeout`] when the budget runs out, carrying the
    ///   last transient error the condition raised
    /// - [`SteadyError::ConditionFailed`] when the condition gives up
    /// - [`SteadyError::MalformedCondition`] on a non-retryable session error
    pub fn until<T, C>(&self, condition: &C) -> SteadyResult<T>
    where
        C: Condition<T> + ?Sized,
    {
        self.until_with_stats(condition).map(|outcome| outcome.value)
    }

    /// Like [`until`](Self::until), also reporting elapsed time and poll count.
    pub fn until_with_stats<T, C>(&self, condition: &C) -> SteadyResult<WaitOutcome<T>>
    where
        C: Condition<T> + ?Sized,
    {
        let start = Instant::now();
        let timeout = self.spec.timeout();
        let mut polls: u32 = 0;
        let mut last_error: Option<SessionError> = None;

        loop {
            polls = polls.saturating_add(1);
            match condition.evaluate(self.session) {
                Ok(Poll::Ready(value)) => {
                    let elapsed = start.elapsed();
                    trace!(
                        condition = %condition.description(),
                        polls,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "condition ready"
                    );
                    return Ok(WaitOutcome {
                        value,
                        elapsed,
                        polls,
                    });
                }
                Ok(Poll::Failed(reason)) => {
                    debug!(condition = %condition.description(), %reason, "condition failed");
                    return Err(SteadyError::ConditionFailed {
                        description: condition.description(),
                        reason,
                    });
                }
                Ok(Poll::Pending) => {}
                Err(err) if !err.is_retryable() => {
                    return Err(SteadyError::MalformedCondition {
                        description: condition.description(),
                        source: err,
                    });
                }
                Err(err) => {
                    trace!(condition = %condition.description(), error = %err, "transient error while polling");
                    last_error = Some(err);
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(
                    condition = %condition.description(),
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "wait timed out"
                );
                return Err(SteadyError::Timeout {
                    description: condition.description(),
                    timeout_ms: self.spec.timeout_ms(),
                    elapsed_ms: elapsed.as_millis() as u64,
                    polls,
                    last_error,
                });
            }
            std::thread::sleep(self.spec.poll_interval().min(timeout - elapsed));
        }
    }

    /// Soft wait: `Ok(None)` on timeout instead of an error.
    ///
    /// # Errors
    ///
    /// Failed and malformed conditions still error.
    pub fn try_until<T, C>(&self, condition: &C) -> SteadyResult<Option<T>>
    where
        C: Condition<T> + ?Sized,
    {
        match self.until(condition) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_timeout() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
