//! Core types for the driver layer

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single element-location strategy.
///
/// Selectors are semantic where possible (`TestId`, `Text`) and structural
/// where necessary (`Css`, `XPath`). A logical element bundles several of
/// these in fallback order; see the locator crate's `Descriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector
    Css(String),

    /// XPath expression
    XPath(String),

    /// Exact (trimmed) visible-text match
    Text(String),

    /// `data-testid` attribute match
    TestId(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Selector::Text(value.into())
    }

    pub fn test_id(value: impl Into<String>) -> Self {
        Selector::TestId(value.into())
    }

    /// Strategy name for logging and NotFound diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Selector::Css(_) => "css",
            Selector::XPath(_) => "xpath",
            Selector::Text(_) => "text",
            Selector::TestId(_) => "test-id",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(v) => write!(f, "css={v}"),
            Selector::XPath(v) => write!(f, "xpath={v}"),
            Selector::Text(v) => write!(f, "text={v}"),
            Selector::TestId(v) => write!(f, "test-id={v}"),
        }
    }
}

/// Opaque handle to a DOM element.
///
/// Handles are valid until the document they were resolved against is
/// replaced; interacting with a handle from an earlier document yields
/// `DriverError::StaleElement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// Interactability snapshot for an element at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    /// Visible and enabled: safe to act on.
    pub fn interactable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// One match returned by a query: the handle plus its state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHit {
    pub handle: ElementHandle,
    pub state: ElementState,
}
