//! Selector catalogs
//!
//! JSON documents mapping dot paths to selector entries:
//!
//! ```json
//! {
//!   "header": {
//!     "login_link": {
//!       "primary": ".ico-login",
//!       "secondary": "a[href='/login']",
//!       "xpath": "//a[text()='Log in']",
//!       "stability": "High"
//!     }
//!   }
//! }
//! ```
//!
//! `locator_set("header.login_link")` yields primary → secondary → xpath.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use tracing::debug;

use crate::locator::{Locator, LocatorSet};
use crate::result::{SteadyError, SteadyResult};

/// Maintainer-assigned confidence in a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Stability {
    /// Stable id or data attribute
    High,
    /// Structural CSS
    Medium,
    /// Positional or text-based
    Low,
    /// Not rated
    #[default]
    Unknown,
}

impl Stability {
    /// Parse a rating, case-insensitively; anything unrecognised is `Unknown`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Stability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|raw| Self::parse(&raw))
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorEntry {
    /// Preferred selector
    pub primary: String,
    /// First fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    /// Last-resort XPath
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    /// Rating, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<Stability>,
}

impl SelectorEntry {
    /// Locators in fallback order
    pub fn locator_set(&self) -> SteadyResult<LocatorSet> {
        let mut set = LocatorSet::single(Locator::parse(&self.primary)?);
        if let Some(secondary) = &self.secondary {
            set = set.or(Locator::parse(secondary)?);
        }
        if let Some(xpath) = &self.xpath {
            if xpath.trim().is_empty() {
                return Err(SteadyError::catalog("xpath selector cannot be empty"));
            }
            set = set.or(Locator::xpath(xpath.trim()));
        }
        Ok(set)
    }
}

/// A loaded selector catalog
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorCatalog {
    root: Value,
}

impl SelectorCatalog {
    /// Parse a catalog
    ///
    /// # Errors
    ///
    /// [`SteadyError::Json`] on malformed JSON, [`SteadyError::Catalog`] when
    /// the document is not an object.
    pub fn from_json_str(json: &str) -> SteadyResult<Self> {
        let root: Value = serde_json::from_str(json)?;
        if !root.is_object() {
            return Err(SteadyError::catalog("catalog root must be a JSON object"));
        }
        Ok(Self { root })
    }

    /// Read and parse a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> SteadyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        debug!(path = %path.display(), "loaded selector catalog");
        Ok(catalog)
    }

    /// Entry at a dot path
    ///
    /// # Errors
    ///
    /// [`SteadyError::SelectorNotFound`] for an unknown path,
    /// [`SteadyError::Catalog`] when the node is not a selector entry.
    pub fn entry(&self, path: &str) -> SteadyResult<SelectorEntry> {
        let mut node = &self.root;
        for part in path.split('.') {
            node = node.get(part).ok_or_else(|| SteadyError::SelectorNotFound {
                path: path.to_string(),
            })?;
        }
        serde_json::from_value(node.clone())
            .map_err(|e| SteadyError::catalog(format!("{path} is not a selector entry: {e}")))
    }

    /// Locator set (primary → secondary → xpath) at a dot path
    pub fn locator_set(&self, path: &str) -> SteadyResult<LocatorSet> {
        self.entry(path)?.locator_set()
    }

    /// Primary locator at a dot path
    pub fn primary(&self, path: &str) -> SteadyResult<Locator> {
        Locator::parse(&self.entry(path)?.primary)
    }

    /// Stability rating at a dot path
    pub fn stability(&self, path: &str) -> SteadyResult<Stability> {
        Ok(self.entry(path)?.stability.unwrap_or_default())
    }
}
