//! Ready-made conditions for the common element and page states.
//!
//! Each factory returns a fresh condition capturing its expected values;
//! the matching `Waiter::for_*` shorthand polls it with the waiter's spec.

use crate::locator::{Locator, LocatorSet, Resolution};
use crate::result::SteadyResult;
use crate::session::{AutomationSession, ElementRef, SessionError, SessionErrorKind};
use crate::settled::READY_STATE_SCRIPT;
use crate::wait::{Condition, FnCondition, Poll, Waiter};

// =============================================================================
// ELEMENT CONDITIONS
// =============================================================================

/// First displayed element of the set
pub fn visible(set: LocatorSet) -> impl Condition<ElementRef> {
    FnCondition::new(format!("visibility of {set}"), move |session: &dyn AutomationSession| {
        Ok(match set.resolve_visible(session)? {
            Resolution::Found { element, .. } => Poll::Ready(element),
            Resolution::NotFound => Poll::Pending,
        })
    })
}

/// First displayed element of the set, once it is also enabled
pub fn clickable(set: LocatorSet) -> impl Condition<ElementRef> {
    FnCondition::new(format!("clickability of {set}"), move |session: &dyn AutomationSession| {
        match set.resolve_visible(session)? {
            Resolution::Found { element, .. } => {
                let enabled = session.is_enabled(&element)?;
                Ok(Poll::ready_if(enabled, || element))
            }
            Resolution::NotFound => Ok(Poll::Pending),
        }
    })
}

/// First element of the set present in the DOM, displayed or not
pub fn present(set: LocatorSet) -> impl Condition<ElementRef> {
    FnCondition::new(format!("presence of {set}"), move |session: &dyn AutomationSession| {
        Ok(match set.resolve(session)? {
            Resolution::Found { element, .. } => Poll::Ready(element),
            Resolution::NotFound => Poll::Pending,
        })
    })
}

/// No element of the set is displayed (absent, hidden or detached)
pub fn invisible(set: LocatorSet) -> impl Condition<()> {
    FnCondition::new(format!("invisibility of {set}"), move |session: &dyn AutomationSession| {
        Ok(match set.resolve_visible(session)? {
            Resolution::Found { .. } => Poll::Pending,
            Resolution::NotFound => Poll::Ready(()),
        })
    })
}

/// The set resolves (`should_exist`) or stops resolving (`!should_exist`)
pub fn exists(set: LocatorSet, should_exist: bool) -> impl Condition<()> {
    let verb = if should_exist { "existence" } else { "absence" };
    FnCondition::new(format!("{verb} of {set}"), move |session: &dyn AutomationSession| {
        let found = set.resolve(session)?.element().is_some();
        Ok(Poll::ready_if(found == should_exist, || ()))
    })
}

/// At least one match, and every match displayed
pub fn all_visible(locator: Locator) -> impl Condition<Vec<ElementRef>> {
    FnCondition::new(
        format!("visibility of all {locator}"),
        move |session: &dyn AutomationSession| {
            let matches = session.find_all(&locator)?;
            if matches.is_empty() {
                return Ok(Poll::Pending);
            }
            for element in &matches {
                if !session.is_displayed(element)? {
                    return Ok(Poll::Pending);
                }
            }
            Ok(Poll::Ready(matches))
        },
    )
}

/// The resolved element's text contains `text`; yields the full text
pub fn text_present(set: LocatorSet, text: impl Into<String>) -> impl Condition<String> {
    let text = text.into();
    FnCondition::new(
        format!("text {text:?} in {set}"),
        move |session: &dyn AutomationSession| {
            let Some(element) = set.resolve(session)?.into_element() else {
                return Ok(Poll::Pending);
            };
            let actual = session.text(&element)?;
            Ok(Poll::ready_if(actual.contains(&text), || actual.clone()))
        },
    )
}

// =============================================================================
// PAGE CONDITIONS
// =============================================================================

/// Current URL contains `fragment`; yields the URL
pub fn url_contains(fragment: impl Into<String>) -> impl Condition<String> {
    let fragment = fragment.into();
    FnCondition::new(
        format!("url containing {fragment:?}"),
        move |session: &dyn AutomationSession| {
            let url = session.current_url()?;
            Ok(Poll::ready_if(url.contains(&fragment), || url.clone()))
        },
    )
}

/// Current URL differs from `original`; yields the new URL
pub fn url_changed_from(original: impl Into<String>) -> impl Condition<String> {
    let original = original.into();
    FnCondition::new(
        format!("url change from {original:?}"),
        move |session: &dyn AutomationSession| {
            let url = session.current_url()?;
            Ok(Poll::ready_if(url != original, || url.clone()))
        },
    )
}

/// Document title contains `fragment`; yields the title
pub fn title_contains(fragment: impl Into<String>) -> impl Condition<String> {
    let fragment = fragment.into();
    FnCondition::new(
        format!("title containing {fragment:?}"),
        move |session: &dyn AutomationSession| {
            let title = session.title()?;
            Ok(Poll::ready_if(title.contains(&fragment), || title.clone()))
        },
    )
}

/// `document.readyState == "complete"`.
///
/// Script errors are transient here; the settled detector is the lenient
/// variant that treats them as ready.
pub fn document_ready() -> impl Condition<()> {
    FnCondition::new("document ready state complete", |session: &dyn AutomationSession| {
        let state = session.execute_script(READY_STATE_SCRIPT, &[])?;
        match state.as_str() {
            Some(state) => Ok(Poll::ready_if(state == "complete", || ())),
            None => Err(SessionError::new(
                SessionErrorKind::Script,
                format!("unexpected readyState {state}"),
            )),
        }
    })
}

// =============================================================================
// WAITER SHORTHANDS
// =============================================================================

impl Waiter<'_> {
    /// Wait for the first displayed element of the set
    pub fn for_visible(&self, set: &LocatorSet) -> SteadyResult<ElementRef> {
        self.until(&visible(set.clone()))
    }

    /// Wait for a displayed and enabled element
    pub fn for_clickable(&self, set: &LocatorSet) -> SteadyResult<ElementRef> {
        self.until(&clickable(set.clone()))
    }

    /// Wait for an element in the DOM
    pub fn for_present(&self, set: &LocatorSet) -> SteadyResult<ElementRef> {
        self.until(&present(set.clone()))
    }

    /// Wait until nothing in the set is displayed
    pub fn for_invisible(&self, set: &LocatorSet) -> SteadyResult<()> {
        self.until(&invisible(set.clone()))
    }

    /// Wait for the element text to contain `text`
    pub fn for_text(&self, set: &LocatorSet, text: &str) -> SteadyResult<String> {
        self.until(&text_present(set.clone(), text))
    }

    /// Wait for the URL to contain `fragment`
    pub fn for_url_contains(&self, fragment: &str) -> SteadyResult<String> {
        self.until(&url_contains(fragment))
    }

    /// Wait for the URL to leave `original`
    pub fn for_url_change(&self, original: &str) -> SteadyResult<String> {
        self.until(&url_changed_from(original))
    }

    /// Wait for the title to contain `fragment`
    pub fn for_title_contains(&self, fragment: &str) -> SteadyResult<String> {
        self.until(&title_contains(fragment))
    }

    /// Wait for `document.readyState == "complete"`
    pub fn for_page_load(&self) -> SteadyResult<()> {
        self.until(&document_ready())
    }

    /// Soft visibility wait: `None` on timeout
    pub fn soft_visible(&self, set: &LocatorSet) -> SteadyResult<Option<ElementRef>> {
        self.try_until(&visible(set.clone()))
    }
}
