//! Steadyhand: synchronization and resilient interaction for browser automation
//!
//! Page Objects locate and act on elements of a page that keeps
//! re-rendering while background requests complete. Steadyhand gives them
//! a small set of primitives that never race the rendering pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    STEADYHAND Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌──────────────────┐      │
//! │   │ Page       │    │ LocatorSet │    │ Waiter           │      │
//! │   │ Object     │───►│ (fallback  │───►│ (Condition       │      │
//! │   │ (caller)   │    │  order)    │    │  Poller)         │      │
//! │   └────────────┘    └────────────┘    └────────┬─────────┘      │
//! │                                                │                 │
//! │   ┌──────────────────┐   ┌─────────────────────▼──────────┐     │
//! │   │ SettledDetector  │◄──│ ActionExecutor                 │     │
//! │   │ StabilityWaiter  │   │ (retry, classify, fallback)    │     │
//! │   └──────────────────┘   └─────────────────────┬──────────┘     │
//! │                                                │                 │
//! │                         ┌──────────────────────▼──────────┐     │
//! │                         │ &dyn AutomationSession          │     │
//! │                         │ (WebDriver adapter/MockSession) │     │
//! │                         └─────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is synchronous and blocking from the caller's point of view.
//! The session is borrowed explicitly by every waiter and executor; run
//! parallel workers with independent sessions.
//!
//! # Example
//!
//! ```
//! use steadyhand::prelude::*;
//!
//! # fn main() -> SteadyResult<()> {
//! let session = MockSession::new();
//! let login = Locator::class_name("ico-login");
//! session.add_element(&login, MockElement::new());
//!
//! let link = LocatorSet::single(login).or(Locator::xpath("//a[text()='Log in']"));
//! Waiter::new(&session).for_clickable(&link)?;
//!
//! let result = ActionExecutor::new(&session).click(&link).into_result()?;
//! assert!(!result.used_fallback());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod catalog;
pub mod conditions;
mod config;
mod executor;
mod locator;
mod logging;
mod mock;
mod result;
pub mod scripts;
mod session;
mod settled;
mod stability;
mod wait;

pub use catalog::{SelectorCatalog, SelectorEntry, Stability};
pub use config::{
    LogConfig, RetrySettings, SettleSettings, SyncConfig, DEFAULT_SCRIPT_TIMEOUT_MS, ENV_PREFIX,
};
pub use executor::{
    ActionExecutor, FailureClass, FallbackStrategy, InteractionResult, LastFailure, Outcome,
    RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
};
pub use locator::{Locator, LocatorSet, Resolution, Strategy};
pub use logging::init_logging;
pub use mock::{MockElement, MockSession};
pub use result::{SteadyError, SteadyResult};
pub use session::{
    Action, AutomationSession, ElementRef, ScriptArg, SelectOption, SessionError,
    SessionErrorKind,
};
pub use settled::{
    SettledDetector, SettledSnapshot, DEFAULT_LOADING_INDICATORS, PENDING_REQUESTS_SCRIPT,
    READY_STATE_SCRIPT,
};
pub use stability::{observed_value, StabilityWaiter, DEFAULT_QUIET_PERIOD_MS};
pub use wait::{
    Condition, FnCondition, Poll, WaitOutcome, WaitSpec, Waiter, DEFAULT_EXPLICIT_TIMEOUT_MS,
    DEFAULT_PAGE_LOAD_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::catalog::*;
    pub use super::config::*;
    pub use super::executor::*;
    pub use super::locator::*;
    pub use super::logging::*;
    pub use super::mock::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::settled::*;
    pub use super::stability::*;
    pub use super::wait::*;
}
