//! Locators and ordered locator sets.
//!
//! # Design Philosophy
//!
//! - **One logical target, many queries**: a `LocatorSet` lists equivalent
//!   queries (stable id first, brittle XPath last) and resolution walks them
//!   in order, first match wins.
//! - **Explicit "no match"**: resolution returns `Resolution::NotFound`
//!   instead of swallowing lookup errors and carrying on.
//! - **Never empty**: a `LocatorSet` cannot be constructed without a locator.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use crate::result::{SteadyError, SteadyResult};
use crate::session::{AutomationSession, ElementRef, SessionError, SessionErrorKind};

// =============================================================================
// STRATEGY
// =============================================================================

/// Query language of a locator (WebDriver "using" strategies)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// `id` attribute
    Id,
    /// Single class name
    ClassName,
    /// `name` attribute
    Name,
    /// Exact link text
    LinkText,
}

impl Strategy {
    /// WebDriver strategy string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
            Self::Id => "id",
            Self::ClassName => "class name",
            Self::Name => "name",
            Self::LinkText => "link text",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// LOCATOR
// =============================================================================

/// A single element query: strategy tag plus query string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    query: String,
}

// Literal patterns; compiling them cannot fail.
#[allow(clippy::expect_used)]
fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#([A-Za-z_][\w-]*)$").expect("valid id pattern"))
}

#[allow(clippy::expect_used)]
fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\.([A-Za-z_][\w-]*)$").expect("valid class pattern"))
}

#[allow(clippy::expect_used)]
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\w+\[name=['"]([^'"]+)['"]\]$"#).expect("valid name pattern")
    })
}

impl Locator {
    /// Create a locator with an explicit strategy
    #[must_use]
    pub fn new(strategy: Strategy, query: impl Into<String>) -> Self {
        Self {
            strategy,
            query: query.into(),
        }
    }

    /// CSS selector locator
    #[must_use]
    pub fn css(query: impl Into<String>) -> Self {
        Self::new(Strategy::Css, query)
    }

    /// XPath locator
    #[must_use]
    pub fn xpath(query: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, query)
    }

    /// `id` attribute locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::new(Strategy::Id, id)
    }

    /// Class name locator
    #[must_use]
    pub fn class_name(class: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, class)
    }

    /// `name` attribute locator
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::new(Strategy::Name, name)
    }

    /// Exact link text locator
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::new(Strategy::LinkText, text)
    }

    /// Infer the strategy from a raw selector string.
    ///
    /// - `#ident` → [`Strategy::Id`]
    /// - `.ident` → [`Strategy::ClassName`]
    /// - `tag[name='x']` → [`Strategy::Name`]
    /// - leading `/` or `(` → [`Strategy::XPath`]
    /// - anything else → [`Strategy::Css`]
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::Catalog`] for an empty selector.
    pub fn parse(raw: &str) -> SteadyResult<Self> {
        let selector = raw.trim();
        if selector.is_empty() {
            return Err(SteadyError::catalog("selector cannot be empty"));
        }

        if selector.starts_with('/') || selector.starts_with('(') {
            return Ok(Self::xpath(selector));
        }
        if let Some(caps) = id_pattern().captures(selector) {
            return Ok(Self::id(&caps[1]));
        }
        if let Some(caps) = class_pattern().captures(selector) {
            return Ok(Self::class_name(&caps[1]));
        }
        if let Some(caps) = name_pattern().captures(selector) {
            return Ok(Self::name(&caps[1]));
        }
        Ok(Self::css(selector))
    }

    /// Query language
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Query string
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy, self.query)
    }
}

// =============================================================================
// LOCATOR SET
// =============================================================================

/// Outcome of resolving a [`LocatorSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An element was found
    Found {
        /// The first matching element
        element: ElementRef,
        /// Index of the locator that matched
        locator_index: usize,
    },
    /// No locator in the set matched anything
    NotFound,
}

impl Resolution {
    /// The resolved element, if any
    #[must_use]
    pub fn element(&self) -> Option<&ElementRef> {
        match self {
            Self::Found { element, .. } => Some(element),
            Self::NotFound => None,
        }
    }

    /// Consume into the resolved element, if any
    #[must_use]
    pub fn into_element(self) -> Option<ElementRef> {
        match self {
            Self::Found { element, .. } => Some(element),
            Self::NotFound => None,
        }
    }
}

/// Ordered, non-empty list of equivalent locators for one logical target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Locator>", into = "Vec<Locator>")]
pub struct LocatorSet {
    locators: Vec<Locator>,
}

impl LocatorSet {
    /// Build a set from locators in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`SteadyError::EmptyLocatorSet`] when `locators` is empty.
    pub fn new(locators: Vec<Locator>) -> SteadyResult<Self> {
        if locators.is_empty() {
            return Err(SteadyError::EmptyLocatorSet);
        }
        Ok(Self { locators })
    }

    /// A set with exactly one locator
    #[must_use]
    pub fn single(locator: Locator) -> Self {
        Self {
            locators: vec![locator],
        }
    }

    /// Append a lower-priority fallback
    #[must_use]
    pub fn or(mut self, fallback: Locator) -> Self {
        self.locators.push(fallback);
        self
    }

    /// Highest-priority locator
    #[must_use]
    pub fn primary(&self) -> &Locator {
        &self.locators[0]
    }

    /// All locators in priority order
    #[must_use]
    pub fn locators(&self) -> &[Locator] {
        &self.locators
    }

    /// Number of locators (always ≥ 1)
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Always false; present for API symmetry with collections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolve to the first element of the first locator with a match.
    ///
    /// Transient lookup errors on one locator move on to the next one;
    /// a malformed query is returned as an error.
    pub fn resolve(&self, session: &dyn AutomationSession) -> Result<Resolution, SessionError> {
        self.resolve_where(session, |_| Ok(true))
    }

    /// Like [`resolve`](Self::resolve), but only displayed elements qualify.
    pub fn resolve_visible(
        &self,
        session: &dyn AutomationSession,
    ) -> Result<Resolution, SessionError> {
        self.resolve_where(session, |element| match session.is_displayed(element) {
            Ok(displayed) => Ok(displayed),
            Err(err) if err.kind() == SessionErrorKind::StaleElement => Ok(false),
            Err(err) => Err(err),
        })
    }

    fn resolve_where<F>(
        &self,
        session: &dyn AutomationSession,
        accept: F,
    ) -> Result<Resolution, SessionError>
    where
        F: Fn(&ElementRef) -> Result<bool, SessionError>,
    {
        for (index, locator) in self.locators.iter().enumerate() {
            let matches = match session.find_all(locator) {
                Ok(matches) => matches,
                Err(err) if err.is_retryable() => {
                    trace!(%locator, error = %err, "locator lookup failed, trying next");
                    continue;
                }
                Err(err) => return Err(err),
            };
            for element in matches {
                if accept(&element)? {
                    trace!(%locator, index, %element, "locator set resolved");
                    return Ok(Resolution::Found {
                        element,
                        locator_index: index,
                    });
                }
            }
        }
        Ok(Resolution::NotFound)
    }
}

impl From<Locator> for LocatorSet {
    fn from(locator: Locator) -> Self {
        Self::single(locator)
    }
}

impl TryFrom<Vec<Locator>> for LocatorSet {
    type Error = SteadyError;

    fn try_from(locators: Vec<Locator>) -> Result<Self, Self::Error> {
        Self::new(locators)
    }
}

impl From<LocatorSet> for Vec<Locator> {
    fn from(set: LocatorSet) -> Self {
        set.locators
    }
}

impl std::fmt::Display for LocatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, locator) in self.locators.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{locator}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockElement, MockSession};

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_id() {
            assert_eq!(Locator::parse("#small-searchterms").unwrap(), Locator::id("small-searchterms"));
        }

        #[test]
        fn test_parse_compound_hash_is_css() {
            let loc = Locator::parse("#topcartlink .qty").unwrap();
            assert_eq!(loc.strategy(), Strategy::Css);
        }

        #[test]
        fn test_parse_class() {
            assert_eq!(Locator::parse(".ico-login").unwrap(), Locator::class_name("ico-login"));
        }

        #[test]
        fn test_parse_class_with_combinator_is_css() {
            assert_eq!(
                Locator::parse(".header-links > a").unwrap().strategy(),
                Strategy::Css
            );
        }

        #[test]
        fn test_parse_name_attribute() {
            assert_eq!(Locator::parse("input[name='Email']").unwrap(), Locator::name("Email"));
        }

        #[test]
        fn test_parse_xpath() {
            assert_eq!(
                Locator::parse("//a[text()='Log in']").unwrap().strategy(),
                Strategy::XPath
            );
            assert_eq!(
                Locator::parse("(//input)[2]").unwrap().strategy(),
                Strategy::XPath
            );
        }

        #[test]
        fn test_parse_trims_and_rejects_empty() {
            assert_eq!(Locator::parse("  button  ").unwrap(), Locator::css("button"));
            assert!(matches!(Locator::parse("   "), Err(SteadyError::Catalog { .. })));
        }

        #[test]
        fn test_locator_display() {
            assert_eq!(Locator::css("a.b").to_string(), "css selector=a.b");
            assert_eq!(Strategy::LinkText.to_string(), "link text");
        }
    }

    mod locator_set_tests {
        use super::*;

        #[test]
        fn test_empty_set_rejected() {
            assert!(matches!(LocatorSet::new(vec![]), Err(SteadyError::EmptyLocatorSet)));
        }

        #[test]
        fn test_builder_order() {
            let set = LocatorSet::single(Locator::id("a")).or(Locator::css(".b"));
            assert_eq!(set.len(), 2);
            assert_eq!(set.primary(), &Locator::id("a"));
            assert!(!set.is_empty());
            assert_eq!(set.to_string(), "[id=a | css selector=.b]");
        }

        #[test]
        fn test_serde_rejects_empty_list() {
            let ok: LocatorSet =
                serde_json::from_str(r#"[{"strategy":"css","query":"a"}]"#).unwrap();
            assert_eq!(ok.primary(), &Locator::css("a"));
            assert!(serde_json::from_str::<LocatorSet>("[]").is_err());
        }

        #[test]
        fn test_resolve_falls_back_to_second_locator() {
            let session = MockSession::new();
            let b = session.add_element(&Locator::css(".b"), MockElement::new());
            let set = LocatorSet::single(Locator::css(".a")).or(Locator::css(".b"));

            let resolution = set.resolve(&session).unwrap();
            assert_eq!(
                resolution,
                Resolution::Found {
                    element: b,
                    locator_index: 1
                }
            );
        }

        #[test]
        fn test_resolve_prefers_first_locator() {
            let session = MockSession::new();
            let a = session.add_element(&Locator::css(".a"), MockElement::new());
            session.add_element(&Locator::css(".b"), MockElement::new());
            let set = LocatorSet::single(Locator::css(".a")).or(Locator::css(".b"));

            assert_eq!(set.resolve(&session).unwrap().element(), Some(&a));
        }

        #[test]
        fn test_resolve_not_found() {
            let session = MockSession::new();
            let set = LocatorSet::single(Locator::css(".missing"));
            assert_eq!(set.resolve(&session).unwrap(), Resolution::NotFound);
        }

        #[test]
        fn test_resolve_skips_transient_lookup_error() {
            let session = MockSession::new();
            session.fail_lookup(&Locator::css(".a"), SessionError::other("frame switching"));
            let b = session.add_element(&Locator::css(".b"), MockElement::new());
            let set = LocatorSet::single(Locator::css(".a")).or(Locator::css(".b"));

            assert_eq!(set.resolve(&session).unwrap().into_element(), Some(b));
        }

        #[test]
        fn test_resolve_propagates_invalid_selector() {
            let session = MockSession::new();
            session.fail_lookup(&Locator::css("a["), SessionError::invalid_selector("a["));
            let set = LocatorSet::single(Locator::css("a[")).or(Locator::css(".b"));

            let err = set.resolve(&session).unwrap_err();
            assert_eq!(err.kind(), SessionErrorKind::InvalidSelector);
        }

        #[test]
        fn test_resolve_visible_skips_hidden() {
            let session = MockSession::new();
            session.add_element(&Locator::css(".a"), MockElement::new().hidden());
            let visible = session.add_element(&Locator::css(".b"), MockElement::new());
            let set = LocatorSet::single(Locator::css(".a")).or(Locator::css(".b"));

            assert!(set.resolve(&session).unwrap().element().is_some());
            assert_eq!(set.resolve_visible(&session).unwrap().into_element(), Some(visible));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_first_matching_locator_wins(
                present in proptest::collection::vec(any::<bool>(), 1..6)
            ) {
                let session = MockSession::new();
                let mut expected = None;
                let mut locators = Vec::new();
                for (i, is_present) in present.iter().enumerate() {
                    let locator = Locator::css(format!(".candidate-{i}"));
                    if *is_present {
                        let el = session.add_element(&locator, MockElement::new());
                        if expected.is_none() {
                            expected = Some((el, i));
                        }
                    }
                    locators.push(locator);
                }
                let set = LocatorSet::new(locators).unwrap();
                let resolution = set.resolve(&session).unwrap();

                match expected {
                    Some((element, locator_index)) => prop_assert_eq!(
                        resolution,
                        Resolution::Found { element, locator_index }
                    ),
                    None => prop_assert_eq!(resolution, Resolution::NotFound),
                }
            }
        }
    }
}
