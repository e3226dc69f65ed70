//! Core types for the locator system

use std::time::Duration;

use cdp_driver::{ElementHandle, Selector};
use serde::{Deserialize, Serialize};

/// Named bundle of fallback locator strategies for one logical UI element.
///
/// Immutable once defined; strategies are tried in insertion order, so the
/// most specific selector should come first and the loosest last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Human-readable element name, used in logs and failure diagnostics.
    pub name: String,

    /// Ordered fallback selectors.
    pub selectors: Vec<Selector>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selectors: Vec::new(),
        }
    }

    pub fn css(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(Selector::css(selector));
        self
    }

    pub fn xpath(mut self, expression: impl Into<String>) -> Self {
        self.selectors.push(Selector::xpath(expression));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.selectors.push(Selector::text(text));
        self
    }

    pub fn test_id(mut self, id: impl Into<String>) -> Self {
        self.selectors.push(Selector::test_id(id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} strategies)", self.name, self.selectors.len())
    }
}

/// Resolver tuning knobs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Poll interval between fallback-chain passes.
    pub poll_interval: Duration,

    /// Timeout used when the caller does not supply one.
    pub default_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(150),
            default_timeout: Duration::from_secs(10),
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Handle to the matched element.
    pub handle: ElementHandle,

    /// The selector that matched.
    pub selector: Selector,

    /// Index of the matching selector within the descriptor.
    pub selector_index: usize,

    /// Time spent resolving.
    pub elapsed: Duration,
}
