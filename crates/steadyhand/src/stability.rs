//! Stability Waiter
//!
//! Waits for an element whose text or value updates asynchronously a
//! bounded number of times (a cart counter, a running total) to stop
//! changing, when the final value is not known in advance.
//!
//! The text and `value` attribute are sampled together every half quiet
//! period, only while the element is displayed. The observed value is
//! returned once neither has changed for a full quiet period of wall-clock
//! time, measured from the sample where one last changed. A hidden or
//! missing element restarts the measurement. The outer timeout is the
//! Condition Poller's.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::SyncConfig;
use crate::locator::LocatorSet;
use crate::result::SteadyResult;
use crate::session::{AutomationSession, ElementRef, SessionError};
use crate::wait::{Condition, Poll, WaitSpec, Waiter, DEFAULT_EXPLICIT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

/// Default quiet period (500ms)
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 500;

/// Samples taken per quiet period
const SAMPLES_PER_QUIET_PERIOD: u64 = 2;

/// Observable value of an element: its text, or its `value` attribute when
/// the text is empty (form inputs)
pub fn observed_value(
    session: &dyn AutomationSession,
    element: &ElementRef,
) -> Result<String, SessionError> {
    let text = session.text(element)?;
    if !text.is_empty() {
        return Ok(text);
    }
    Ok(session.attribute(element, "value")?.unwrap_or_default())
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Text and `value` attribute read together; either changing is a change
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sample {
    text: String,
    value: Option<String>,
}

impl Sample {
    fn read(session: &dyn AutomationSession, element: &ElementRef) -> Result<Self, SessionError> {
        Ok(Self {
            text: session.text(element)?,
            value: session.attribute(element, "value")?,
        })
    }

    /// Same rule as [`observed_value`]
    fn observed(&self) -> String {
        if self.text.is_empty() {
            self.value.clone().unwrap_or_default()
        } else {
            self.text.clone()
        }
    }
}

/// Ready once the displayed element's sample has held for `quiet`.
///
/// Holds the last sample and when it was first seen; one instance per wait.
struct StableValue {
    set: LocatorSet,
    quiet: Duration,
    last: RefCell<Option<(Sample, Instant)>>,
}

impl StableValue {
    fn new(set: LocatorSet, quiet: Duration) -> Self {
        Self {
            set,
            quiet,
            last: RefCell::new(None),
        }
    }

    fn sample(&self, session: &dyn AutomationSession) -> Result<Option<Sample>, SessionError> {
        let Some(element) = self.set.resolve(session)?.into_element() else {
            return Ok(None);
        };
        if !session.is_displayed(&element)? {
            return Ok(None);
        }
        Sample::read(session, &element).map(Some)
    }
}

impl Condition<String> for StableValue {
    fn evaluate(&self, session: &dyn AutomationSession) -> Result<Poll<String>, SessionError> {
        let sample = match self.sample(session) {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                self.last.replace(None);
                return Ok(Poll::Pending);
            }
            Err(err) => {
                self.last.replace(None);
                return Err(err);
            }
        };

        let mut last = self.last.borrow_mut();
        if let Some((previous, since)) = last.as_ref() {
            if *previous == sample {
                let held = since.elapsed();
                return Ok(Poll::ready_if(held >= self.quiet, || sample.observed()));
            }
        }
        trace!(locators = %self.set, text = %sample.text, value = ?sample.value, "observed value changed");
        let observed = sample.observed();
        *last = Some((sample, Instant::now()));
        Ok(Poll::ready_if(self.quiet.is_zero(), || observed))
    }

    fn description(&self) -> String {
        format!("value of {} to hold for {}ms", self.set, self.quiet.as_millis())
    }
}

/// Ready with the first observed value that differs from `original`
struct ChangedValue {
    set: LocatorSet,
    original: String,
}

impl Condition<String> for ChangedValue {
    fn evaluate(&self, session: &dyn AutomationSession) -> Result<Poll<String>, SessionError> {
        let Some(element) = self.set.resolve(session)?.into_element() else {
            return Ok(Poll::Pending);
        };
        let value = observed_value(session, &element)?;
        Ok(Poll::ready_if(value != self.original, || value))
    }

    fn description(&self) -> String {
        format!("value of {} to change from {:?}", self.set, self.original)
    }
}

// =============================================================================
// WAITER
// =============================================================================

/// Waits for element values to stop changing
pub struct StabilityWaiter<'s> {
    session: &'s dyn AutomationSession,
    quiet_period_ms: u64,
    timeout_ms: u64,
    poll_interval_ms: u64,
}

impl std::fmt::Debug for StabilityWaiter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityWaiter")
            .field("quiet_period_ms", &self.quiet_period_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish_non_exhaustive()
    }
}

impl<'s> StabilityWaiter<'s> {
    /// Waiter with default quiet period and timeout
    #[must_use]
    pub fn new(session: &'s dyn AutomationSession) -> Self {
        Self {
            session,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            timeout_ms: DEFAULT_EXPLICIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Waiter using the configured quiet period, explicit timeout and poll interval
    #[must_use]
    pub fn from_config(session: &'s dyn AutomationSession, config: &SyncConfig) -> Self {
        Self {
            session,
            quiet_period_ms: config.stability_quiet_ms,
            timeout_ms: config.explicit_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// Wait until the observed value holds for `quiet_period_ms`.
    ///
    /// # Errors
    ///
    /// - [`crate::SteadyError::Timeout`] if the value keeps changing
    /// - [`crate::SteadyError::InvalidWaitSpec`] for a zero timeout
    pub fn wait_stable(
        &self,
        set: &LocatorSet,
        quiet_period_ms: u64,
        timeout_ms: u64,
    ) -> SteadyResult<String> {
        let poll_ms = (quiet_period_ms / SAMPLES_PER_QUIET_PERIOD).clamp(1, timeout_ms.max(1));
        let spec = WaitSpec::new(timeout_ms, poll_ms)?;
        let condition = StableValue::new(set.clone(), Duration::from_millis(quiet_period_ms));
        Waiter::with_spec(self.session, spec).until(&condition)
    }

    /// [`wait_stable`](Self::wait_stable) with the waiter's quiet period and timeout
    pub fn wait_stable_default(&self, set: &LocatorSet) -> SteadyResult<String> {
        self.wait_stable(set, self.quiet_period_ms, self.timeout_ms)
    }

    /// Wait for the observed value to differ from `original` and return it
    ///
    /// # Errors
    ///
    /// [`crate::SteadyError::Timeout`] if the value never changes.
    pub fn wait_for_value_change(
        &self,
        set: &LocatorSet,
        original: &str,
        timeout_ms: u64,
    ) -> SteadyResult<String> {
        let spec = WaitSpec::new(timeout_ms, self.poll_interval_ms.min(timeout_ms))?;
        let condition = ChangedValue {
            set: set.clone(),
            original: original.to_string(),
        };
        Waiter::with_spec(self.session, spec).until(&condition)
    }
}
