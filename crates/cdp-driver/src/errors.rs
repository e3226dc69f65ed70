//! Error types for the driver layer

use thiserror::Error;

/// Driver error enumeration
///
/// The transient/fatal split drives retry decisions upstream: transient
/// errors are worth a re-resolve and retry, fatal errors mean the page or
/// browser is gone and the flow must surface an infrastructure failure.
#[derive(Debug, Error, Clone)]
pub enum DriverError {
    /// Browser could not be launched or attached
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// DevTools protocol communication failed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The page or target crashed or was closed underneath us
    #[error("Page gone: {0}")]
    PageGone(String),

    /// Element handle no longer refers to a live DOM node
    #[error("Stale element handle")]
    StaleElement,

    /// Element exists but cannot be interacted with
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Navigation failed or was interrupted
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Selector could not be evaluated against the page
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

impl DriverError {
    /// Whether a retry after re-resolving the element may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::StaleElement
                | DriverError::NotInteractable(_)
                | DriverError::Navigation(_)
        )
    }

    /// Whether the page/browser is unusable (infrastructure failure).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::Launch(_) | DriverError::Protocol(_) | DriverError::PageGone(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Protocol(err.to_string())
    }
}
