//! The consumed browser interface

use async_trait::async_trait;

use crate::errors::DriverError;
use crate::types::{ElementHandle, ElementHit, ElementState, Selector};

/// Browser driver trait
///
/// One instance corresponds to one exclusive browser session (a single
/// page/tab). Query methods are read-only; `navigate`, `click` and `fill`
/// mutate page state and are not idempotent in general.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the session's page to a URL.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Query the current document for a selector.
    ///
    /// Returns every match together with its visibility/enabled snapshot;
    /// callers decide what match cardinality is acceptable.
    async fn query(&self, selector: &Selector) -> Result<Vec<ElementHit>, DriverError>;

    /// Re-check the state of a previously resolved element.
    async fn element_state(&self, handle: ElementHandle) -> Result<ElementState, DriverError>;

    /// Click an element.
    async fn click(&self, handle: ElementHandle) -> Result<(), DriverError>;

    /// Fill an input element: clears any prior value, then types the text.
    ///
    /// Overwrite semantics are part of the contract so that a retried fill
    /// cannot compound with an earlier partial attempt.
    async fn fill(&self, handle: ElementHandle, text: &str) -> Result<(), DriverError>;

    /// Visible text content of an element (trimmed).
    async fn text(&self, handle: ElementHandle) -> Result<String, DriverError>;

    /// Current value of an input element.
    async fn value(&self, handle: ElementHandle) -> Result<String, DriverError>;

    /// URL of the current document.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Title of the current document.
    async fn title(&self) -> Result<String, DriverError>;

    /// Full-page screenshot as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Navigate back in session history.
    async fn go_back(&self) -> Result<(), DriverError>;
}
