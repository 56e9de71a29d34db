//! Resilient Action Executor
//!
//! Performs click / type / select against a [`LocatorSet`] with a bounded
//! retry loop that classifies each failure and picks a fallback invocation
//! per class.
//!
//! ## Attempt flow
//!
//! ```text
//!  attempt n ──► resolve (cached ref unless invalidated)
//!                 │ NotFound ──────────────────────────────► back off
//!                 ▼
//!               native invoke ── ok ──► Success
//!                 │ err
//!                 ▼
//!               classify ─ StaleReference ─ drop cache ─────► back off
//!                        ─ NotFound ─────── drop cache ─────► back off
//!                        ─ Intercepted / NotInteractable ─┐
//!                        ─ Other (first time only) ───────┤
//!                                                         ▼
//!                                         fallback ── ok ──► Success (used_fallback)
//!                                            │ err
//!                                            ▼
//!                                         back off (skipped after the last attempt)
//! ```
//!
//! Fallbacks run inside an attempt and never consume one, so at most
//! `max_attempts` native invocations are made per call.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::SyncConfig;
use crate::locator::{LocatorSet, Resolution};
use crate::result::{SteadyError, SteadyResult};
use crate::scripts;
use crate::session::{
    Action, AutomationSession, ElementRef, SelectOption, SessionError, SessionErrorKind,
};
use crate::settled::SettledDetector;
use crate::wait::{Condition, WaitSpec, Waiter};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default number of attempts per action
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts (250ms)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

// =============================================================================
// FAILURE CLASS
// =============================================================================

/// Category of an interaction failure; selects the fallback strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The resolved reference no longer points at a live node
    StaleReference,
    /// Another element would receive the input
    Intercepted,
    /// The element is not actionable yet (hidden, zero-size, disabled)
    NotInteractable,
    /// Nothing matched any locator of the set
    NotFound,
    /// Anything else
    Other,
}

impl FailureClass {
    /// Every class, in declaration order
    pub const ALL: [Self; 5] = [
        Self::StaleReference,
        Self::Intercepted,
        Self::NotInteractable,
        Self::NotFound,
        Self::Other,
    ];

    /// Classify a session error
    #[must_use]
    pub const fn classify(error: &SessionError) -> Self {
        match error.kind() {
            SessionErrorKind::StaleElement => Self::StaleReference,
            SessionErrorKind::ClickIntercepted => Self::Intercepted,
            SessionErrorKind::NotInteractable => Self::NotInteractable,
            SessionErrorKind::NoSuchElement => Self::NotFound,
            SessionErrorKind::InvalidSelector
            | SessionErrorKind::Script
            | SessionErrorKind::Timeout
            | SessionErrorKind::Other => Self::Other,
        }
    }

    /// Get the class name string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StaleReference => "stale reference",
            Self::Intercepted => "intercepted",
            Self::NotInteractable => "not interactable",
            Self::NotFound => "not found",
            Self::Other => "other",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::StaleReference => 0,
            Self::Intercepted => 1,
            Self::NotInteractable => 2,
            Self::NotFound => 3,
            Self::Other => 4,
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// RETRY POLICY
// =============================================================================

/// How to work around a failed native invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Just retry
    #[default]
    None,
    /// Perform the action through an in-page script
    ScriptInvoke,
    /// Scroll the element into view, then invoke natively once more
    ScrollIntoView,
}

/// Attempt budget, back-off delay and per-class fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    fallbacks: [FallbackStrategy; 5],
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            fallbacks: [
                FallbackStrategy::None,         // StaleReference
                FallbackStrategy::ScriptInvoke, // Intercepted
                FallbackStrategy::ScriptInvoke, // NotInteractable
                FallbackStrategy::None,         // NotFound
                FallbackStrategy::ScriptInvoke, // Other
            ],
        }
    }
}

impl RetryPolicy {
    /// Policy with the default fallbacks.
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::InvalidRetryPolicy`] when `max_attempts` is zero.
    pub fn new(max_attempts: u32, delay_ms: u64) -> SteadyResult<Self> {
        if max_attempts == 0 {
            return Err(SteadyError::InvalidRetryPolicy {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(Self {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
            ..Self::default()
        })
    }

    /// Policy from the `retry` section of the configuration
    pub fn from_config(config: &SyncConfig) -> SteadyResult<Self> {
        Self::new(config.retry.max_attempts, config.retry.delay_ms)
    }

    /// Set the fallback for one class
    #[must_use]
    pub fn with_fallback(mut self, class: FailureClass, strategy: FallbackStrategy) -> Self {
        self.fallbacks[class.index()] = strategy;
        self
    }

    /// Disable every fallback
    #[must_use]
    pub fn without_fallbacks(mut self) -> Self {
        self.fallbacks = [FallbackStrategy::None; 5];
        self
    }

    /// Attempt budget
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Back-off between attempts
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Fallback configured for `class`
    #[must_use]
    pub const fn fallback_for(&self, class: FailureClass) -> FallbackStrategy {
        self.fallbacks[class.index()]
    }
}

// =============================================================================
// INTERACTION RESULT
// =============================================================================

/// The failure that ended the last attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastFailure {
    /// Classification of the error
    pub class: FailureClass,
    /// The concrete native error
    pub error: SessionError,
}

/// How an interaction ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action took effect
    Success,
    /// Every attempt failed
    ExhaustedRetries(LastFailure),
}

/// Result of one executor call; immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionResult {
    action: Action,
    outcome: Outcome,
    attempts_used: u32,
    used_fallback: bool,
}

impl InteractionResult {
    fn success(action: &Action, attempts_used: u32, used_fallback: bool) -> Self {
        Self {
            action: action.clone(),
            outcome: Outcome::Success,
            attempts_used,
            used_fallback,
        }
    }

    fn exhausted(action: &Action, attempts_used: u32, last: LastFailure) -> Self {
        Self {
            action: action.clone(),
            outcome: Outcome::ExhaustedRetries(last),
            attempts_used,
            used_fallback: false,
        }
    }

    /// The action performed
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// How it ended
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Native attempts made
    #[must_use]
    pub const fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    /// Whether success came through a fallback (a brittle-selector hint)
    #[must_use]
    pub const fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// Whether the action took effect
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// The final failure, if exhausted
    #[must_use]
    pub const fn last_failure(&self) -> Option<&LastFailure> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::ExhaustedRetries(last) => Some(last),
        }
    }

    /// Turn exhaustion into a single error.
    ///
    /// # Errors
    ///
    /// [`SteadyError::ActionExhausted`] with the attempt count, class and last error.
    pub fn into_result(self) -> SteadyResult<Self> {
        match self.outcome {
            Outcome::Success => Ok(self),
            Outcome::ExhaustedRetries(last) => Err(SteadyError::ActionExhausted {
                action: self.action.to_string(),
                attempts: self.attempts_used,
                class: last.class,
                source: last.error,
            }),
        }
    }
}

// =============================================================================
// EXECUTOR
// =============================================================================

/// Performs actions against one borrowed session
pub struct ActionExecutor<'s> {
    session: &'s dyn AutomationSession,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ActionExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'s> ActionExecutor<'s> {
    /// Executor with the default policy
    #[must_use]
    pub fn new(session: &'s dyn AutomationSession) -> Self {
        Self::with_policy(session, RetryPolicy::default())
    }

    /// Executor with an explicit default policy
    #[must_use]
    pub fn with_policy(session: &'s dyn AutomationSession, policy: RetryPolicy) -> Self {
        Self { session, policy }
    }

    /// Executor using the configured retry policy
    pub fn from_config(session: &'s dyn AutomationSession, config: &SyncConfig) -> SteadyResult<Self> {
        Ok(Self::with_policy(session, RetryPolicy::from_config(config)?))
    }

    /// Default policy used by the shorthands
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Click with the default policy
    pub fn click(&self, locators: &LocatorSet) -> InteractionResult {
        self.perform(locators, &Action::Click, &self.policy)
    }

    /// Replace the element's value with the default policy
    pub fn set_value(&self, locators: &LocatorSet, text: &str) -> InteractionResult {
        self.perform(locators, &Action::SetValue(text.to_string()), &self.policy)
    }

    /// Choose a select option with the default policy
    pub fn select(&self, locators: &LocatorSet, option: SelectOption) -> InteractionResult {
        self.perform(locators, &Action::Select(option), &self.policy)
    }

    /// Perform the action, then wait for the page to settle.
    ///
    /// A settle timeout is logged and does not change the result.
    pub fn perform_and_settle(
        &self,
        locators: &LocatorSet,
        action: &Action,
        detector: &SettledDetector<'_>,
    ) -> InteractionResult {
        let result = self.perform(locators, action, &self.policy);
        if result.is_success() {
            if let Err(err) = detector.wait_for_settled() {
                warn!(action = action.name(), %locators, error = %err, "page did not settle after action");
            }
        }
        result
    }

    /// Perform the action, then wait for `condition` within `spec`.
    ///
    /// The condition is polled only after a successful action; an exhausted
    /// action returns `None` without waiting.
    ///
    /// # Errors
    ///
    /// Errors of the wait itself, such as [`SteadyError::Timeout`].
    pub fn perform_and_wait<T, C>(
        &self,
        locators: &LocatorSet,
        action: &Action,
        condition: &C,
        spec: WaitSpec,
    ) -> SteadyResult<(InteractionResult, Option<T>)>
    where
        C: Condition<T> + ?Sized,
    {
        let result = self.perform(locators, action, &self.policy);
        if !result.is_success() {
            return Ok((result, None));
        }
        let value = Waiter::with_spec(self.session, spec).until(condition)?;
        Ok((result, Some(value)))
    }

    /// Click, then wait for `condition`
    pub fn click_and_wait<T, C>(
        &self,
        locators: &LocatorSet,
        condition: &C,
        spec: WaitSpec,
    ) -> SteadyResult<(InteractionResult, Option<T>)>
    where
        C: Condition<T> + ?Sized,
    {
        self.perform_and_wait(locators, &Action::Click, condition, spec)
    }

    /// Perform `action` on the first element `locators` resolves to.
    #[instrument(level = "debug", skip_all, fields(action = action.name(), locators = %locators))]
    pub fn perform(
        &self,
        locators: &LocatorSet,
        action: &Action,
        policy: &RetryPolicy,
    ) -> InteractionResult {
        let max_attempts = policy.max_attempts().max(1);
        let mut cached: Option<ElementRef> = None;
        let mut last: Option<LastFailure> = None;
        let mut other_fallback_spent = false;

        for attempt in 1..=max_attempts {
            let element = match cached.clone() {
                Some(element) => element,
                None => match locators.resolve(self.session) {
                    Ok(Resolution::Found {
                        element,
                        locator_index,
                    }) => {
                        if locator_index > 0 {
                            debug!(attempt, locator_index, "primary locator missed, using fallback locator");
                        }
                        cached = Some(element.clone());
                        element
                    }
                    Ok(Resolution::NotFound) => {
                        debug!(attempt, class = %FailureClass::NotFound, "no locator matched");
                        last = Some(LastFailure {
                            class: FailureClass::NotFound,
                            error: SessionError::no_such_element(format!(
                                "no element matched {locators}"
                            )),
                        });
                        back_off(attempt, max_attempts, policy);
                        continue;
                    }
                    Err(err) => {
                        warn!(attempt, error = %err, "malformed locator, not retrying");
                        return InteractionResult::exhausted(
                            action,
                            attempt,
                            LastFailure {
                                class: FailureClass::classify(&err),
                                error: err,
                            },
                        );
                    }
                },
            };

            let err = match self.session.invoke(&element, action) {
                Ok(()) => {
                    debug!(attempt, "action succeeded");
                    return InteractionResult::success(action, attempt, false);
                }
                Err(err) => err,
            };

            let class = FailureClass::classify(&err);
            debug!(attempt, %class, error = %err, "native invocation failed");

            let strategy = match class {
                FailureClass::StaleReference | FailureClass::NotFound => {
                    cached = None;
                    FallbackStrategy::None
                }
                FailureClass::Intercepted | FailureClass::NotInteractable => policy.fallback_for(class),
                FailureClass::Other if !other_fallback_spent => {
                    other_fallback_spent = true;
                    policy.fallback_for(class)
                }
                FailureClass::Other => FallbackStrategy::None,
            };
            last = Some(LastFailure { class, error: err });

            if let Some(outcome) = self.fallback(strategy, &element, action) {
                match outcome {
                    Ok(()) => {
                        debug!(attempt, ?strategy, "fallback succeeded");
                        return InteractionResult::success(action, attempt, true);
                    }
                    Err(fallback_err) => {
                        debug!(attempt, ?strategy, error = %fallback_err, "fallback failed");
                        if FailureClass::classify(&fallback_err) == FailureClass::StaleReference {
                            cached = None;
                        }
                    }
                }
            }

            back_off(attempt, max_attempts, policy);
        }

        let last = last.unwrap_or_else(|| LastFailure {
            class: FailureClass::Other,
            error: SessionError::other("no attempt was made"),
        });
        warn!(attempts = max_attempts, class = %last.class, error = %last.error, "retries exhausted");
        InteractionResult::exhausted(action, max_attempts, last)
    }

    fn fallback(
        &self,
        strategy: FallbackStrategy,
        element: &ElementRef,
        action: &Action,
    ) -> Option<Result<(), SessionError>> {
        match strategy {
            FallbackStrategy::None => None,
            FallbackStrategy::ScriptInvoke => Some(scripts::invoke(self.session, element, action)),
            FallbackStrategy::ScrollIntoView => Some(
                scripts::scroll_into_view(self.session, element)
                    .and_then(|()| self.session.invoke(element, action)),
            ),
        }
    }
}

fn back_off(attempt: u32, max_attempts: u32, policy: &RetryPolicy) {
    if attempt < max_attempts && !policy.delay().is_zero() {
        std::thread::sleep(policy.delay());
    }
}

// =============================================================================
// TESTS
// =============================================================================
