//! Mock automation session for unit testing
//!
//! An in-memory, scriptable [`AutomationSession`]. Page Objects built on
//! this crate can be tested without a browser: register elements under
//! locators, queue the failures a real page would produce (intercepted
//! clicks, stale references, slow rendering) and inspect what was invoked.
//!
//! Values that change over time (text, visibility, ready state, pending
//! request count, URL) are modelled as sample queues: each read consumes
//! one sample and the last sample sticks.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use uuid::Uuid;

use crate::locator::Locator;
use crate::scripts::{CLICK_SCRIPT, SCROLL_INTO_VIEW_SCRIPT, SELECT_OPTION_SCRIPT, SET_VALUE_SCRIPT};
use crate::session::{
    Action, AutomationSession, ElementRef, ScriptArg, SelectOption, SessionError,
};
use crate::settled::{PENDING_REQUESTS_SCRIPT, READY_STATE_SCRIPT};

// =============================================================================
// SAMPLES
// =============================================================================

/// Queue of successive observations; the last one sticks
#[derive(Debug, Clone)]
struct Samples<T> {
    queue: VecDeque<T>,
}

impl<T: Clone> Samples<T> {
    fn new(initial: T) -> Self {
        Self {
            queue: VecDeque::from([initial]),
        }
    }

    fn replace(&mut self, values: impl IntoIterator<Item = T>) {
        let values: VecDeque<T> = values.into_iter().collect();
        if !values.is_empty() {
            self.queue = values;
        }
    }

    fn current(&self) -> Option<T> {
        self.queue.front().cloned()
    }

    fn next(&mut self) -> Option<T> {
        if self.queue.len() > 1 {
            self.queue.pop_front()
        } else {
            self.current()
        }
    }
}

// =============================================================================
// MOCK ELEMENT
// =============================================================================

/// Initial state of a mock element
#[derive(Debug, Clone)]
pub struct MockElement {
    displayed: Vec<bool>,
    enabled: bool,
    texts: Vec<String>,
    attributes: HashMap<String, String>,
    options: Vec<String>,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            displayed: vec![true],
            enabled: true,
            texts: vec![String::new()],
            attributes: HashMap::new(),
            options: Vec::new(),
        }
    }
}

impl MockElement {
    /// A visible, enabled element with empty text
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Not displayed
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.displayed = vec![false];
        self
    }

    /// Displayed state per `is_displayed` call, last value sticks
    #[must_use]
    pub fn with_visibility(mut self, samples: impl IntoIterator<Item = bool>) -> Self {
        let samples: Vec<bool> = samples.into_iter().collect();
        if !samples.is_empty() {
            self.displayed = samples;
        }
        self
    }

    /// Disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Fixed text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.texts = vec![text.into()];
        self
    }

    /// Text per `text` call, last value sticks
    #[must_use]
    pub fn with_texts<S: Into<String>>(mut self, texts: impl IntoIterator<Item = S>) -> Self {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        if !texts.is_empty() {
            self.texts = texts;
        }
        self
    }

    /// Attribute value
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Options of a select element (text and value are the same string)
    #[must_use]
    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
struct ElementState {
    displayed: Samples<bool>,
    enabled: bool,
    texts: Samples<String>,
    attributes: HashMap<String, String>,
    options: Vec<String>,
    attached: bool,
    invoke_failures: VecDeque<SessionError>,
    rerender_on_invoke: bool,
    native_invocations: usize,
    clicks: usize,
}

impl ElementState {
    fn from_mock(mock: MockElement) -> Self {
        let mut displayed = Samples::new(true);
        displayed.replace(mock.displayed);
        let mut texts = Samples::new(String::new());
        texts.replace(mock.texts);
        Self {
            displayed,
            enabled: mock.enabled,
            texts,
            attributes: mock.attributes,
            options: mock.options,
            attached: true,
            invoke_failures: VecDeque::new(),
            rerender_on_invoke: false,
            native_invocations: 0,
            clicks: 0,
        }
    }

    fn rerendered(&self) -> Self {
        Self {
            displayed: Samples::new(self.displayed.current().unwrap_or(true)),
            texts: Samples::new(self.texts.current().unwrap_or_default()),
            attached: true,
            invoke_failures: VecDeque::new(),
            rerender_on_invoke: false,
            native_invocations: 0,
            clicks: 0,
            ..self.clone()
        }
    }

    fn choose(&self, option: &SelectOption) -> Option<String> {
        if self.options.is_empty() {
            return Some(match option {
                SelectOption::Text(s) | SelectOption::Value(s) => s.clone(),
                SelectOption::Index(i) => i.to_string(),
            });
        }
        match option {
            SelectOption::Text(s) | SelectOption::Value(s) => {
                self.options.iter().find(|o| *o == s).cloned()
            }
            SelectOption::Index(i) => self.options.get(*i).cloned(),
        }
    }
}

// =============================================================================
// MOCK SESSION
// =============================================================================

#[derive(Debug)]
struct MockState {
    elements: HashMap<ElementRef, ElementState>,
    lookups: HashMap<Locator, Vec<ElementRef>>,
    lookup_failures: HashMap<Locator, SessionError>,
    lookup_counts: HashMap<Locator, usize>,
    script_failures: VecDeque<SessionError>,
    script_errors: HashMap<String, SessionError>,
    script_results: HashMap<String, Value>,
    script_counts: HashMap<String, usize>,
    ready_state: Samples<String>,
    pending_requests: Samples<Option<i64>>,
    url: Samples<String>,
    title: String,
    history: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            elements: HashMap::new(),
            lookups: HashMap::new(),
            lookup_failures: HashMap::new(),
            lookup_counts: HashMap::new(),
            script_failures: VecDeque::new(),
            script_errors: HashMap::new(),
            script_results: HashMap::new(),
            script_counts: HashMap::new(),
            ready_state: Samples::new("complete".to_string()),
            pending_requests: Samples::new(None),
            url: Samples::new("about:blank".to_string()),
            title: String::new(),
            history: Vec::new(),
        }
    }
}

impl MockState {
    fn rerender(&mut self, element: &ElementRef) -> ElementRef {
        let fresh = ElementRef::new(format!("mock-{}", Uuid::new_v4()));
        let replacement = match self.elements.get_mut(element) {
            Some(old) => {
                let replacement = old.rerendered();
                old.attached = false;
                replacement
            }
            None => ElementState::from_mock(MockElement::new()),
        };
        self.elements.insert(fresh.clone(), replacement);
        for matches in self.lookups.values_mut() {
            for e in matches.iter_mut() {
                if e == element {
                    *e = fresh.clone();
                }
            }
        }
        fresh
    }

    fn live(&mut self, element: &ElementRef) -> Result<&mut ElementState, SessionError> {
        match self.elements.get_mut(element) {
            Some(state) if state.attached => Ok(state),
            _ => Err(SessionError::stale(format!(
                "{element} is not attached to the page document"
            ))),
        }
    }
}

/// In-memory automation session
#[derive(Debug, Default)]
pub struct MockSession {
    state: RefCell<MockState>,
}

impl MockSession {
    /// Create an empty page: `about:blank`, ready state `complete`, no jQuery
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Page setup
    // -------------------------------------------------------------------------

    /// Register a new element matched by `locator`
    pub fn add_element(&self, locator: &Locator, element: MockElement) -> ElementRef {
        let element_ref = ElementRef::new(format!("mock-{}", Uuid::new_v4()));
        let mut state = self.state.borrow_mut();
        state
            .elements
            .insert(element_ref.clone(), ElementState::from_mock(element));
        state
            .lookups
            .entry(locator.clone())
            .or_default()
            .push(element_ref.clone());
        element_ref
    }

    /// Make an existing element also match `locator`
    pub fn attach(&self, locator: &Locator, element: &ElementRef) {
        self.state
            .borrow_mut()
            .lookups
            .entry(locator.clone())
            .or_default()
            .push(element.clone());
    }

    /// Every `find_all` for `locator` fails with `error`
    pub fn fail_lookup(&self, locator: &Locator, error: SessionError) {
        self.state
            .borrow_mut()
            .lookup_failures
            .insert(locator.clone(), error);
    }

    /// Undo [`fail_lookup`](Self::fail_lookup)
    pub fn clear_lookup_failure(&self, locator: &Locator) {
        self.state.borrow_mut().lookup_failures.remove(locator);
    }

    /// Remove the element from the page; its reference becomes stale
    pub fn detach(&self, element: &ElementRef) {
        let mut state = self.state.borrow_mut();
        if let Some(el) = state.elements.get_mut(element) {
            el.attached = false;
        }
        for matches in state.lookups.values_mut() {
            matches.retain(|e| e != element);
        }
    }

    /// Replace the element with a fresh node in the same positions.
    ///
    /// The old reference goes stale; the new one is returned.
    pub fn rerender(&self, element: &ElementRef) -> ElementRef {
        self.state.borrow_mut().rerender(element)
    }

    /// Re-render the element when it is next invoked natively.
    ///
    /// That invocation fails with a stale reference, as when the DOM is
    /// replaced between lookup and action.
    pub fn rerender_on_next_invoke(&self, element: &ElementRef) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.rerender_on_invoke = true;
        }
    }

    /// Set visibility
    pub fn set_visible(&self, element: &ElementRef, displayed: bool) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.displayed = Samples::new(displayed);
        }
    }

    /// Set enabled state
    pub fn set_enabled(&self, element: &ElementRef, enabled: bool) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.enabled = enabled;
        }
    }

    /// Set fixed text
    pub fn set_text(&self, element: &ElementRef, text: impl Into<String>) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.texts = Samples::new(text.into());
        }
    }

    /// Text per `text` call, last value sticks
    pub fn queue_texts<S: Into<String>>(
        &self,
        element: &ElementRef,
        texts: impl IntoIterator<Item = S>,
    ) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.texts.replace(texts.into_iter().map(Into::into));
        }
    }

    /// Set an attribute
    pub fn set_attribute(&self, element: &ElementRef, name: &str, value: impl Into<String>) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.attributes.insert(name.to_string(), value.into());
        }
    }

    /// The next native invocations on `element` fail with these errors, in order
    pub fn queue_invoke_failures(
        &self,
        element: &ElementRef,
        errors: impl IntoIterator<Item = SessionError>,
    ) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(element) {
            el.invoke_failures.extend(errors);
        }
    }

    /// The next `execute_script` calls fail with these errors, in order
    pub fn queue_script_failures(&self, errors: impl IntoIterator<Item = SessionError>) {
        self.state.borrow_mut().script_failures.extend(errors);
    }

    /// Every execution of exactly `script` fails with `error`
    pub fn fail_script(&self, script: &str, error: SessionError) {
        self.state
            .borrow_mut()
            .script_errors
            .insert(script.to_string(), error);
    }

    /// Every execution of exactly `script` returns `result`
    pub fn set_script_result(&self, script: &str, result: Value) {
        self.state
            .borrow_mut()
            .script_results
            .insert(script.to_string(), result);
    }

    /// Set `document.readyState`
    pub fn set_ready_state(&self, ready_state: impl Into<String>) {
        self.state.borrow_mut().ready_state = Samples::new(ready_state.into());
    }

    /// `document.readyState` per probe, last value sticks
    pub fn queue_ready_states<S: Into<String>>(&self, states: impl IntoIterator<Item = S>) {
        self.state
            .borrow_mut()
            .ready_state
            .replace(states.into_iter().map(Into::into));
    }

    /// Pending-request counter; `None` means the page has no jQuery
    pub fn set_pending_requests(&self, pending: Option<i64>) {
        self.state.borrow_mut().pending_requests = Samples::new(pending);
    }

    /// Pending-request counter per probe, last value sticks
    pub fn queue_pending_requests(&self, samples: impl IntoIterator<Item = Option<i64>>) {
        self.state.borrow_mut().pending_requests.replace(samples);
    }

    /// Set the current URL
    pub fn set_url(&self, url: impl Into<String>) {
        self.state.borrow_mut().url = Samples::new(url.into());
    }

    /// URL per `current_url` call, last value sticks
    pub fn queue_urls<S: Into<String>>(&self, urls: impl IntoIterator<Item = S>) {
        self.state
            .borrow_mut()
            .url
            .replace(urls.into_iter().map(Into::into));
    }

    /// Set the document title
    pub fn set_title(&self, title: impl Into<String>) {
        self.state.borrow_mut().title = title.into();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().history.clone()
    }

    /// Check if a history entry starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state
            .borrow()
            .history
            .iter()
            .any(|entry| entry.starts_with(prefix))
    }

    /// Native invocations attempted on the element, failed ones included
    #[must_use]
    pub fn native_invocations(&self, element: &ElementRef) -> usize {
        self.state
            .borrow()
            .elements
            .get(element)
            .map_or(0, |el| el.native_invocations)
    }

    /// Successful clicks on the element, native or scripted
    #[must_use]
    pub fn clicks(&self, element: &ElementRef) -> usize {
        self.state
            .borrow()
            .elements
            .get(element)
            .map_or(0, |el| el.clicks)
    }

    /// How many times `script` was executed
    #[must_use]
    pub fn script_calls(&self, script: &str) -> usize {
        self.state
            .borrow()
            .script_counts
            .get(script)
            .copied()
            .unwrap_or(0)
    }

    /// How many times `locator` was looked up
    #[must_use]
    pub fn lookup_count(&self, locator: &Locator) -> usize {
        self.state
            .borrow()
            .lookup_counts
            .get(locator)
            .copied()
            .unwrap_or(0)
    }

    /// Current attribute value, attached or not
    #[must_use]
    pub fn attribute_of(&self, element: &ElementRef, name: &str) -> Option<String> {
        self.state
            .borrow()
            .elements
            .get(element)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    fn run_script(&self, script: &str, args: &[ScriptArg]) -> Result<Value, SessionError> {
        let mut state = self.state.borrow_mut();

        if script == PENDING_REQUESTS_SCRIPT {
            return Ok(state
                .pending_requests
                .next()
                .flatten()
                .map_or(Value::Null, Value::from));
        }
        if script == READY_STATE_SCRIPT {
            return Ok(state.ready_state.next().map_or(Value::Null, Value::from));
        }

        let element = match args.first() {
            Some(ScriptArg::Element(element)) => element.clone(),
            _ => return Ok(Value::Null),
        };
        let el = state.live(&element)?;

        if script == CLICK_SCRIPT {
            el.clicks += 1;
        } else if script == SET_VALUE_SCRIPT {
            let text = match args.get(1) {
                Some(ScriptArg::Value(Value::String(text))) => text.clone(),
                _ => String::new(),
            };
            el.attributes.insert("value".to_string(), text);
        } else if script == SELECT_OPTION_SCRIPT {
            let option = match (args.get(1), args.get(2)) {
                (Some(ScriptArg::Value(Value::String(mode))), Some(ScriptArg::Value(wanted))) => {
                    match (mode.as_str(), wanted) {
                        ("text", Value::String(s)) => Some(SelectOption::Text(s.clone())),
                        ("value", Value::String(s)) => Some(SelectOption::Value(s.clone())),
                        ("index", Value::Number(n)) => n
                            .as_u64()
                            .and_then(|i| usize::try_from(i).ok())
                            .map(SelectOption::Index),
                        _ => None,
                    }
                }
                _ => None,
            };
            let Some(chosen) = option.and_then(|o| el.choose(&o)) else {
                return Ok(Value::Bool(false));
            };
            el.attributes.insert("value".to_string(), chosen);
            return Ok(Value::Bool(true));
        }
        // scroll and unknown element scripts have no observable effect
        Ok(Value::Null)
    }
}

fn script_name(script: &str) -> &'static str {
    match script {
        s if s == PENDING_REQUESTS_SCRIPT => "pending_requests",
        s if s == READY_STATE_SCRIPT => "ready_state",
        s if s == CLICK_SCRIPT => "click",
        s if s == SET_VALUE_SCRIPT => "set_value",
        s if s == SELECT_OPTION_SCRIPT => "select_option",
        s if s == SCROLL_INTO_VIEW_SCRIPT => "scroll_into_view",
        _ => "custom",
    }
}

impl AutomationSession for MockSession {
    fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        let mut state = self.state.borrow_mut();
        *state.lookup_counts.entry(locator.clone()).or_insert(0) += 1;
        if let Some(err) = state.lookup_failures.get(locator) {
            return Err(err.clone());
        }
        Ok(state.lookups.get(locator).cloned().unwrap_or_default())
    }

    fn is_displayed(&self, element: &ElementRef) -> Result<bool, SessionError> {
        let mut state = self.state.borrow_mut();
        Ok(state.live(element)?.displayed.next().unwrap_or(false))
    }

    fn is_enabled(&self, element: &ElementRef) -> Result<bool, SessionError> {
        let mut state = self.state.borrow_mut();
        Ok(state.live(element)?.enabled)
    }

    fn text(&self, element: &ElementRef) -> Result<String, SessionError> {
        let mut state = self.state.borrow_mut();
        Ok(state.live(element)?.texts.next().unwrap_or_default())
    }

    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, SessionError> {
        let mut state = self.state.borrow_mut();
        Ok(state.live(element)?.attributes.get(name).cloned())
    }

    fn invoke(&self, element: &ElementRef, action: &Action) -> Result<(), SessionError> {
        let mut state = self.state.borrow_mut();
        state.history.push(format!("invoke:{action}:{element}"));
        let el = state.live(element)?;
        el.native_invocations += 1;

        if el.rerender_on_invoke {
            state.rerender(element);
            return Err(SessionError::stale(format!(
                "{element} was replaced before the action ran"
            )));
        }
        if let Some(err) = el.invoke_failures.pop_front() {
            return Err(err);
        }
        if !el.displayed.current().unwrap_or(false) {
            return Err(SessionError::not_interactable(format!("{element} is not displayed")));
        }

        match action {
            Action::Click => el.clicks += 1,
            Action::SetValue(text) => {
                if !el.enabled {
                    return Err(SessionError::not_interactable(format!("{element} is disabled")));
                }
                el.attributes.insert("value".to_string(), text.clone());
            }
            Action::Select(option) => {
                let chosen = el.choose(option).ok_or_else(|| {
                    SessionError::no_such_element(format!("cannot locate option with {option}"))
                })?;
                el.attributes.insert("value".to_string(), chosen);
            }
        }
        Ok(())
    }

    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> Result<Value, SessionError> {
        {
            let mut state = self.state.borrow_mut();
            state.history.push(format!("script:{}", script_name(script)));
            *state.script_counts.entry(script.to_string()).or_insert(0) += 1;

            if let Some(err) = state.script_failures.pop_front() {
                return Err(err);
            }
            if let Some(err) = state.script_errors.get(script) {
                return Err(err.clone());
            }
            if let Some(result) = state.script_results.get(script) {
                return Ok(result.clone());
            }
        }
        self.run_script(script, args)
    }

    fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.state.borrow_mut().url.next().unwrap_or_default())
    }

    fn title(&self) -> Result<String, SessionError> {
        Ok(self.state.borrow().title.clone())
    }

    fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let mut state = self.state.borrow_mut();
        state.history.push(format!("navigate:{url}"));
        state.url = Samples::new(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::SessionErrorKind;

    mod mock_element_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let session = MockSession::new();
            let el = session.add_element(&Locator::id("a"), MockElement::new());
            assert!(session.is_displayed(&el).unwrap());
            assert!(session.is_enabled(&el).unwrap());
            assert_eq!(session.text(&el).unwrap(), "");
            assert!(el.id().starts_with("mock-"));
        }

        #[test]
        fn test_texts_last_value_sticks() {
            let session = MockSession::new();
            let el = session.add_element(&Locator::id("n"), MockElement::new().with_texts(["1", "2"]));
            assert_eq!(session.text(&el).unwrap(), "1");
            assert_eq!(session.text(&el).unwrap(), "2");
            assert_eq!(session.text(&el).unwrap(), "2");
        }

        #[test]
        fn test_visibility_samples() {
            let session = MockSession::new();
            let el = session.add_element(
                &Locator::id("v"),
                MockElement::new().with_visibility([false, true]),
            );
            assert!(!session.is_displayed(&el).unwrap());
            assert!(session.is_displayed(&el).unwrap());
            assert!(session.is_displayed(&el).unwrap());
        }
    }

    mod mock_session_tests {
        use super::*;

        #[test]
        fn test_find_all_in_insertion_order() {
            let session = MockSession::new();
            let loc = Locator::css("li");
            let a = session.add_element(&loc, MockElement::new());
            let b = session.add_element(&loc, MockElement::new());
            assert_eq!(session.find_all(&loc).unwrap(), vec![a, b]);
            assert!(session.find_all(&Locator::css("ul")).unwrap().is_empty());
            assert_eq!(session.lookup_count(&loc), 1);
        }

        #[test]
        fn test_detach_makes_reference_stale() {
            let session = MockSession::new();
            let loc = Locator::id("row");
            let el = session.add_element(&loc, MockElement::new());
            session.detach(&el);
            assert!(session.find_all(&loc).unwrap().is_empty());
            assert_eq!(
                session.text(&el).unwrap_err().kind(),
                SessionErrorKind::StaleElement
            );
        }

        #[test]
        fn test_rerender_replaces_in_place() {
            let session = MockSession::new();
            let loc = Locator::id("row");
            let old = session.add_element(&loc, MockElement::new().with_text("x"));
            let fresh = session.rerender(&old);
            assert_ne!(old, fresh);
            assert_eq!(session.find_all(&loc).unwrap(), vec![fresh.clone()]);
            assert_eq!(session.text(&fresh).unwrap(), "x");
            assert!(session.invoke(&old, &Action::Click).is_err());
        }

        #[test]
        fn test_rerendered_node_is_live() {
            let session = MockSession::new();
            let loc = Locator::id("qty");
            let old = session.add_element(&loc, MockElement::new().with_attribute("value", "1"));
            let fresh = session.rerender(&old);
            session.invoke(&fresh, &Action::SetValue("2".into())).unwrap();
            assert!(session.is_displayed(&fresh).unwrap());
            assert_eq!(session.attribute_of(&fresh, "value").as_deref(), Some("2"));
            assert_eq!(
                session.is_displayed(&old).unwrap_err().kind(),
                SessionErrorKind::StaleElement
            );
        }

        #[test]
        fn test_rerender_on_next_invoke() {
            let session = MockSession::new();
            let loc = Locator::id("btn");
            let old = session.add_element(&loc, MockElement::new());
            session.rerender_on_next_invoke(&old);
            assert_eq!(
                session.invoke(&old, &Action::Click).unwrap_err().kind(),
                SessionErrorKind::StaleElement
            );
            let fresh = session.find_all(&loc).unwrap().remove(0);
            assert_ne!(fresh, old);
            session.invoke(&fresh, &Action::Click).unwrap();
            assert_eq!(session.clicks(&fresh), 1);
        }

        #[test]
        fn test_queued_invoke_failures() {
            let session = MockSession::new();
            let el = session.add_element(&Locator::id("btn"), MockElement::new());
            session.queue_invoke_failures(&el, [SessionError::intercepted("overlay")]);
            assert_eq!(
                session.invoke(&el, &Action::Click).unwrap_err().kind(),
                SessionErrorKind::ClickIntercepted
            );
            session.invoke(&el, &Action::Click).unwrap();
            assert_eq!(session.native_invocations(&el), 2);
            assert_eq!(session.clicks(&el), 1);
            assert!(session.was_called("invoke:click"));
        }

        #[test]
        fn test_hidden_element_not_interactable() {
            let session = MockSession::new();
            let el = session.add_element(&Locator::id("btn"), MockElement::new().hidden());
            assert_eq!(
                session.invoke(&el, &Action::Click).unwrap_err().kind(),
                SessionErrorKind::NotInteractable
            );
        }

        #[test]
        fn test_pending_requests_probe() {
            let session = MockSession::new();
            assert_eq!(
                session.execute_script(PENDING_REQUESTS_SCRIPT, &[]).unwrap(),
                Value::Null
            );
            session.queue_pending_requests([Some(2), Some(0)]);
            assert_eq!(
                session.execute_script(PENDING_REQUESTS_SCRIPT, &[]).unwrap(),
                Value::from(2)
            );
            assert_eq!(
                session.execute_script(PENDING_REQUESTS_SCRIPT, &[]).unwrap(),
                Value::from(0)
            );
        }

        #[test]
        fn test_script_failures_take_priority() {
            let session = MockSession::new();
            session.queue_script_failures([SessionError::script("boom")]);
            assert!(session.execute_script(READY_STATE_SCRIPT, &[]).is_err());
            assert_eq!(
                session.execute_script(READY_STATE_SCRIPT, &[]).unwrap(),
                Value::from("complete")
            );
            assert_eq!(session.script_calls(READY_STATE_SCRIPT), 2);
        }

        #[test]
        fn test_custom_script_result() {
            let session = MockSession::new();
            session.set_script_result("return window.pendingFetches;", Value::from(3));
            assert_eq!(
                session
                    .execute_script("return window.pendingFetches;", &[])
                    .unwrap(),
                Value::from(3)
            );
            assert!(session.was_called("script:custom"));
        }

        #[test]
        fn test_navigate_updates_url() {
            let session = MockSession::new();
            assert_eq!(session.current_url().unwrap(), "about:blank");
            session.navigate("https://shop.example/").unwrap();
            assert_eq!(session.current_url().unwrap(), "https://shop.example/");
            assert_eq!(session.history(), vec!["navigate:https://shop.example/".to_string()]);
        }
    }
}
