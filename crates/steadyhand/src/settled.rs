//! Async-Settled Detector
//!
//! Decides whether the page has finished its background work by combining
//! three independent heuristics:
//!
//! ```text
//!   pending-request counter == 0     (fail-open: absent counter passes)
//! ∧ no loading indicator displayed   (lookup errors count as hidden)
//! ∧ document.readyState == complete  (fail-open: script error passes)
//! ```
//!
//! `is_settled` never blocks; `wait_for_settled` drives it through the
//! Condition Poller.

use serde_json::Value;
use tracing::{debug, trace};

use crate::config::SyncConfig;
use crate::locator::Locator;
use crate::result::SteadyResult;
use crate::session::AutomationSession;
use crate::wait::{FnCondition, Poll, WaitSpec, Waiter, DEFAULT_PAGE_LOAD_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Reads jQuery's active-request counter, `null` when jQuery is absent
pub const PENDING_REQUESTS_SCRIPT: &str =
    "return (typeof jQuery !== 'undefined') ? jQuery.active : null;";

/// Reads `document.readyState`
pub const READY_STATE_SCRIPT: &str = "return document.readyState;";

/// Loading indicator selectors checked by default
pub const DEFAULT_LOADING_INDICATORS: &[&str] = &[
    ".loading",
    ".spinner",
    ".ajax-loader",
    "[class*='loading']",
    "[class*='spinner']",
    "[id*='loading']",
    ".overlay",
    ".progress",
];

// =============================================================================
// SNAPSHOT
// =============================================================================

/// One reading of all settledness heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettledSnapshot {
    /// Active request count, `None` when no counter is available
    pub pending_requests: Option<u64>,
    /// Whether any loading indicator is displayed
    pub indicator_visible: bool,
    /// Whether the document finished loading
    pub document_ready: bool,
}

impl SettledSnapshot {
    /// All heuristics pass
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.requests_idle() && !self.indicator_visible && self.document_ready
    }

    /// No pending requests, or no counter to ask
    #[must_use]
    pub const fn requests_idle(&self) -> bool {
        match self.pending_requests {
            Some(n) => n == 0,
            None => true,
        }
    }
}

// =============================================================================
// DETECTOR
// =============================================================================

/// Composite "background work settled" check against one session
pub struct SettledDetector<'s> {
    session: &'s dyn AutomationSession,
    loading_indicators: Vec<Locator>,
    pending_requests_script: String,
    spec: WaitSpec,
    page_load_spec: WaitSpec,
}

impl std::fmt::Debug for SettledDetector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettledDetector")
            .field("loading_indicators", &self.loading_indicators)
            .field("pending_requests_script", &self.pending_requests_script)
            .field("spec", &self.spec)
            .field("page_load_spec", &self.page_load_spec)
            .finish_non_exhaustive()
    }
}

impl<'s> SettledDetector<'s> {
    /// Detector with the default indicators, probe script and timings
    #[must_use]
    pub fn new(session: &'s dyn AutomationSession) -> Self {
        Self {
            session,
            loading_indicators: DEFAULT_LOADING_INDICATORS
                .iter()
                .map(|selector| Locator::css(*selector))
                .collect(),
            pending_requests_script: PENDING_REQUESTS_SCRIPT.to_string(),
            spec: WaitSpec::default(),
            page_load_spec: WaitSpec::new(DEFAULT_PAGE_LOAD_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS)
                .unwrap_or_default(),
        }
    }

    /// Detector configured from [`SyncConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`crate::SteadyError::InvalidWaitSpec`] for inconsistent timings.
    pub fn from_config(session: &'s dyn AutomationSession, config: &SyncConfig) -> SteadyResult<Self> {
        Ok(Self {
            session,
            loading_indicators: config
                .settle
                .loading_indicators
                .iter()
                .map(Locator::css)
                .collect(),
            pending_requests_script: config.settle.pending_requests_script.clone(),
            spec: WaitSpec::from_config(config)?,
            page_load_spec: WaitSpec::new(config.page_load_timeout_ms, config.poll_interval_ms)?,
        })
    }

    /// Replace the loading indicator list
    #[must_use]
    pub fn with_indicators(mut self, indicators: Vec<Locator>) -> Self {
        self.loading_indicators = indicators;
        self
    }

    /// Replace the pending-request probe (must return a number or `null`)
    #[must_use]
    pub fn with_pending_requests_script(mut self, script: impl Into<String>) -> Self {
        self.pending_requests_script = script.into();
        self
    }

    /// Timing for [`wait_for_settled`](Self::wait_for_settled) and
    /// [`wait_for_requests_idle`](Self::wait_for_requests_idle)
    #[must_use]
    pub const fn with_spec(mut self, spec: WaitSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Timing for [`wait_for_page_load`](Self::wait_for_page_load)
    #[must_use]
    pub const fn with_page_load_spec(mut self, spec: WaitSpec) -> Self {
        self.page_load_spec = spec;
        self
    }

    /// Loading indicators checked
    #[must_use]
    pub fn loading_indicators(&self) -> &[Locator] {
        &self.loading_indicators
    }

    /// Non-blocking composite check
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.snapshot().is_settled()
    }

    /// Read every heuristic once
    #[must_use]
    pub fn snapshot(&self) -> SettledSnapshot {
        self.probe(self.session)
    }

    /// Block until settled.
    ///
    /// # Errors
    ///
    /// [`crate::SteadyError::Timeout`] when the page keeps working past the budget.
    pub fn wait_for_settled(&self) -> SteadyResult<SettledSnapshot> {
        let condition = FnCondition::new("asynchronous activity to settle", |session: &dyn AutomationSession| {
            let snapshot = self.probe(session);
            trace!(?snapshot, "settledness probe");
            Ok(Poll::ready_if(snapshot.is_settled(), || snapshot))
        });
        Waiter::with_spec(self.session, self.spec).until(&condition)
    }

    /// Block until the pending-request counter reaches zero (or is absent)
    pub fn wait_for_requests_idle(&self) -> SteadyResult<()> {
        let condition = FnCondition::new("pending requests to drain", |session: &dyn AutomationSession| {
            let pending = self.pending_requests(session);
            Ok(Poll::ready_if(pending.map_or(true, |n| n == 0), || ()))
        });
        Waiter::with_spec(self.session, self.spec).until(&condition)
    }

    /// Block until `document.readyState` is complete, using the page-load budget
    pub fn wait_for_page_load(&self) -> SteadyResult<()> {
        let condition = FnCondition::new("page load", |session: &dyn AutomationSession| {
            Ok(Poll::ready_if(document_ready(session), || ()))
        });
        Waiter::with_spec(self.session, self.page_load_spec).until(&condition)
    }

    fn probe(&self, session: &dyn AutomationSession) -> SettledSnapshot {
        SettledSnapshot {
            pending_requests: self.pending_requests(session),
            indicator_visible: self.indicator_visible(session),
            document_ready: document_ready(session),
        }
    }

    fn pending_requests(&self, session: &dyn AutomationSession) -> Option<u64> {
        match session.execute_script(&self.pending_requests_script, &[]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| if f > 0.0 { f as u64 } else { 0 })),
            Ok(_) => None,
            Err(err) => {
                debug!(error = %err, "pending-request counter unavailable, treating as idle");
                None
            }
        }
    }

    fn indicator_visible(&self, session: &dyn AutomationSession) -> bool {
        self.loading_indicators.iter().any(|locator| {
            session.find_all(locator).map_or(false, |matches| {
                matches
                    .iter()
                    .any(|element| session.is_displayed(element).unwrap_or(false))
            })
        })
    }
}

fn document_ready(session: &dyn AutomationSession) -> bool {
    match session.execute_script(READY_STATE_SCRIPT, &[]) {
        Ok(Value::String(state)) => state == "complete",
        Ok(_) => false,
        Err(err) => {
            debug!(error = %err, "readyState unavailable, treating as complete");
            true
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockElement, MockSession};
    use crate::session::SessionError;

    fn fast(detector: SettledDetector<'_>) -> SettledDetector<'_> {
        let spec = WaitSpec::new(300, 10).unwrap();
        detector.with_spec(spec).with_page_load_spec(spec)
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_quiet_page_is_settled() {
            let session = MockSession::new();
            let detector = SettledDetector::new(&session);
            let snapshot = detector.snapshot();
            assert_eq!(
                snapshot,
                SettledSnapshot {
                    pending_requests: None,
                    indicator_visible: false,
                    document_ready: true,
                }
            );
            assert!(detector.is_settled());
        }

        #[test]
        fn test_pending_requests_block() {
            let session = MockSession::new();
            session.set_pending_requests(Some(2));
            let detector = SettledDetector::new(&session);
            assert_eq!(detector.snapshot().pending_requests, Some(2));
            assert!(!detector.is_settled());
        }

        #[test]
        fn test_counter_script_error_fails_open() {
            let session = MockSession::new();
            session.fail_script(PENDING_REQUESTS_SCRIPT, SessionError::script("jQuery is not defined"));
            assert!(SettledDetector::new(&session).is_settled());
        }

        #[test]
        fn test_visible_indicator_blocks() {
            let session = MockSession::new();
            session.add_element(&Locator::css(".ajax-loader"), MockElement::new());
            assert!(SettledDetector::new(&session).snapshot().indicator_visible);
        }

        #[test]
        fn test_hidden_indicator_ignored() {
            let session = MockSession::new();
            session.add_element(&Locator::css(".spinner"), MockElement::new().hidden());
            assert!(SettledDetector::new(&session).is_settled());
        }

        #[test]
        fn test_indicator_lookup_error_counts_as_hidden() {
            let session = MockSession::new();
            session.fail_lookup(&Locator::css(".overlay"), SessionError::other("frame detached"));
            assert!(SettledDetector::new(&session).is_settled());
        }

        #[test]
        fn test_ready_state_loading_blocks() {
            let session = MockSession::new();
            session.set_ready_state("interactive");
            assert!(!SettledDetector::new(&session).snapshot().document_ready);
        }

        #[test]
        fn test_ready_state_error_fails_open() {
            let session = MockSession::new();
            session.fail_script(READY_STATE_SCRIPT, SessionError::script("page navigating"));
            assert!(SettledDetector::new(&session).snapshot().document_ready);
        }

        #[test]
        fn test_custom_indicators_and_probe() {
            let session = MockSession::new();
            session.add_element(&Locator::css(".spinner"), MockElement::new());
            session.set_script_result("return window.__inflight;", Value::from(0));
            let detector = SettledDetector::new(&session)
                .with_indicators(vec![Locator::css(".busy")])
                .with_pending_requests_script("return window.__inflight;");
            assert_eq!(detector.snapshot().pending_requests, Some(0));
            assert!(detector.is_settled());
        }

        #[test]
        fn test_from_config() {
            let session = MockSession::new();
            let mut config = SyncConfig::default();
            config.settle.loading_indicators = vec![".busy".to_string()];
            let detector = SettledDetector::from_config(&session, &config).unwrap();
            assert_eq!(detector.loading_indicators(), &[Locator::css(".busy")]);
        }
    }

    mod wait_tests {
        use super::*;

        #[test]
        fn test_wait_for_settled_after_requests_drain() {
            let session = MockSession::new();
            session.queue_pending_requests([Some(3), Some(1), Some(0)]);
            let snapshot = fast(SettledDetector::new(&session)).wait_for_settled().unwrap();
            assert_eq!(snapshot.pending_requests, Some(0));
        }

        #[test]
        fn test_wait_for_settled_times_out_on_spinner() {
            let session = MockSession::new();
            session.add_element(&Locator::css(".loading"), MockElement::new());
            let err = fast(SettledDetector::new(&session)).wait_for_settled().unwrap_err();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_wait_for_requests_idle_ignores_indicators() {
            let session = MockSession::new();
            session.add_element(&Locator::css(".loading"), MockElement::new());
            session.queue_pending_requests([Some(1), Some(0)]);
            fast(SettledDetector::new(&session)).wait_for_requests_idle().unwrap();
        }

        #[test]
        fn test_wait_for_page_load() {
            let session = MockSession::new();
            session.queue_ready_states(["loading", "complete"]);
            fast(SettledDetector::new(&session)).wait_for_page_load().unwrap();
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_absent_counter_never_unsettles(
                pending in proptest::option::of(0i64..5),
                spinner in any::<bool>(),
                ready in any::<bool>(),
            ) {
                let build = |counter: Option<i64>| {
                    let session = MockSession::new();
                    if spinner {
                        session.add_element(&Locator::css(".spinner"), MockElement::new());
                    }
                    session.set_ready_state(if ready { "complete" } else { "loading" });
                    session.set_pending_requests(counter);
                    session
                };

                let with_counter = build(pending);
                let without_counter = build(None);
                let settled_with = SettledDetector::new(&with_counter).is_settled();
                let settled_without = SettledDetector::new(&without_counter).is_settled();

                prop_assert!(!settled_with || settled_without);
                prop_assert_eq!(settled_without, !spinner && ready);
            }
        }
    }
}
