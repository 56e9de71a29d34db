//! Automation Session - the external browser capability
//!
//! Everything in this crate operates on a borrowed `&dyn AutomationSession`.
//! The session is exclusively owned by one worker; nothing here locks it or
//! stores it globally, so parallel workers simply hold independent sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   &dyn AutomationSession   ┌──────────────────────────┐
//! │ Page Object  │ ─────────────────────────► │ Waiter / SettledDetector │
//! │ (caller)     │                            │ ActionExecutor           │
//! └──────────────┘                            └────────────┬─────────────┘
//!                                                          │ find_all / invoke /
//!                                                          │ execute_script ...
//!                                             ┌────────────▼─────────────┐
//!                                             │ WebDriver / CDP adapter  │
//!                                             │ or MockSession           │
//!                                             └──────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locator::Locator;

// =============================================================================
// ELEMENT REFERENCE
// =============================================================================

/// Opaque reference to a live DOM node, as handed out by the session.
///
/// A reference may go stale at any time when the page re-renders; every
/// session call taking an `ElementRef` can then fail with
/// [`SessionErrorKind::StaleElement`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    id: String,
}

impl ElementRef {
    /// Wrap a driver-specific element id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Driver-specific element id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "element({})", self.id)
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// How an option of a `<select>` is chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectOption {
    /// Match the option's visible text
    Text(String),
    /// Match the option's `value` attribute
    Value(String),
    /// Zero-based option index
    Index(usize),
}

impl std::fmt::Display for SelectOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(t) => write!(f, "text={t:?}"),
            Self::Value(v) => write!(f, "value={v:?}"),
            Self::Index(i) => write!(f, "index={i}"),
        }
    }
}

/// A primitive interaction the executor can perform on an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Click the element
    Click,
    /// Clear the element and type the given text
    SetValue(String),
    /// Choose an option of a select element
    Select(SelectOption),
}

impl Action {
    /// Short name used in logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::SetValue(_) => "set_value",
            Self::Select(_) => "select",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::SetValue(text) => write!(f, "set_value({text:?})"),
            Self::Select(option) => write!(f, "select({option})"),
        }
    }
}

// =============================================================================
// SCRIPT ARGUMENTS
// =============================================================================

/// Argument passed to [`AutomationSession::execute_script`]
///
/// Scripts see arguments as `arguments[0]`, `arguments[1]`, ...
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// A DOM node, marshalled by the driver
    Element(ElementRef),
    /// Any JSON-representable value
    Value(serde_json::Value),
}

impl From<&ElementRef> for ScriptArg {
    fn from(element: &ElementRef) -> Self {
        Self::Element(element.clone())
    }
}

impl From<&str> for ScriptArg {
    fn from(value: &str) -> Self {
        Self::Value(serde_json::Value::String(value.to_string()))
    }
}

impl From<usize> for ScriptArg {
    fn from(value: usize) -> Self {
        Self::Value(serde_json::Value::from(value))
    }
}

// =============================================================================
// SESSION ERRORS
// =============================================================================

/// Category of a failed session call, mirroring WebDriver error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionErrorKind {
    /// The element reference no longer points at a live node
    StaleElement,
    /// Another element would receive the click
    ClickIntercepted,
    /// The element exists but cannot be interacted with (hidden, zero-size, disabled)
    NotInteractable,
    /// No element matched, or an option/child was missing
    NoSuchElement,
    /// The locator query itself is malformed
    InvalidSelector,
    /// Script evaluation failed
    Script,
    /// The driver gave up on the call
    Timeout,
    /// Anything else
    Other,
}

impl SessionErrorKind {
    /// Get the kind name string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StaleElement => "stale element reference",
            Self::ClickIntercepted => "element click intercepted",
            Self::NotInteractable => "element not interactable",
            Self::NoSuchElement => "no such element",
            Self::InvalidSelector => "invalid selector",
            Self::Script => "javascript error",
            Self::Timeout => "timeout",
            Self::Other => "unknown error",
        }
    }
}

impl std::fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error reported by the automation session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SessionError {
    kind: SessionErrorKind,
    message: String,
}

impl SessionError {
    /// Create an error of the given kind
    #[must_use]
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Stale element reference
    #[must_use]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::StaleElement, message)
    }

    /// Click intercepted by another element
    #[must_use]
    pub fn intercepted(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::ClickIntercepted, message)
    }

    /// Element not interactable
    #[must_use]
    pub fn not_interactable(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::NotInteractable, message)
    }

    /// No such element
    #[must_use]
    pub fn no_such_element(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::NoSuchElement, message)
    }

    /// Malformed locator
    #[must_use]
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InvalidSelector, message)
    }

    /// Script evaluation error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Script, message)
    }

    /// Unclassified driver error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Other, message)
    }

    /// Error category
    #[must_use]
    pub const fn kind(&self) -> SessionErrorKind {
        self.kind
    }

    /// Driver-provided message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether waiting and asking again can ever succeed.
    ///
    /// Only a malformed locator is permanent; everything else may be an
    /// artifact of the page still rendering.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self.kind, SessionErrorKind::InvalidSelector)
    }
}

// =============================================================================
// SESSION TRAIT
// =============================================================================

/// The capability set of a remote browser session.
///
/// Implemented by WebDriver/CDP adapters outside this crate and by
/// [`crate::MockSession`] for tests. Methods take `&self`: a session is used
/// by a single thread of control and adapters keep any connection state
/// behind their own interior mutability.
pub trait AutomationSession {
    /// All elements matching the locator, in document order.
    ///
    /// Zero matches is `Ok(vec![])`, never an error.
    fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError>;

    /// Whether the element is rendered and visible
    fn is_displayed(&self, element: &ElementRef) -> Result<bool, SessionError>;

    /// Whether the element accepts input
    fn is_enabled(&self, element: &ElementRef) -> Result<bool, SessionError>;

    /// Rendered text of the element
    fn text(&self, element: &ElementRef) -> Result<String, SessionError>;

    /// Attribute or property value, `None` when absent
    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, SessionError>;

    /// Native, simulated user interaction
    fn invoke(&self, element: &ElementRef, action: &Action) -> Result<(), SessionError>;

    /// Run a script in the page and return its JSON-converted result
    fn execute_script(
        &self,
        script: &str,
        args: &[ScriptArg],
    ) -> Result<serde_json::Value, SessionError>;

    /// URL of the current document
    fn current_url(&self) -> Result<String, SessionError>;

    /// Title of the current document
    fn title(&self) -> Result<String, SessionError>;

    /// Load a new document
    fn navigate(&self, url: &str) -> Result<(), SessionError>;
}
