//! Error types for the locator system

use cdp_driver::DriverError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No strategy matched a unique visible, enabled element within budget
    #[error("Element '{}' not found after {}ms (tried: {})", descriptor, elapsed_ms, tried.join(", "))]
    NotFound {
        descriptor: String,
        tried: Vec<String>,
        elapsed_ms: u64,
    },

    /// Descriptor carries no strategies
    #[error("Descriptor '{0}' has no selectors")]
    EmptyDescriptor(String),

    /// Driver failed while querying
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Resolution was cancelled externally
    #[error("Resolution cancelled")]
    Cancelled,
}

impl LocatorError {
    /// Infrastructure failures are not worth retrying at a higher level.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LocatorError::Driver(err) if err.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_strategies() {
        let err = LocatorError::NotFound {
            descriptor: "sign-in button".to_string(),
            tried: vec!["css=#sgnBt".to_string(), "text=Sign in".to_string()],
            elapsed_ms: 5000,
        };
        let message = err.to_string();
        assert!(message.contains("sign-in button"));
        assert!(message.contains("css=#sgnBt"));
        assert!(message.contains("5000ms"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(LocatorError::Driver(DriverError::PageGone("gone".into())).is_fatal());
        assert!(!LocatorError::Cancelled.is_fatal());
    }
}
