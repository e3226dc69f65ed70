//! Error types for interaction execution

use cdp_driver::DriverError;
use element_locator::LocatorError;
use thiserror::Error;

/// Execution error enumeration
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Retry budget spent without a successful attempt.
    #[error("{action} failed after {attempts} attempts: {last_cause}")]
    Exhausted {
        action: String,
        attempts: u32,
        last_cause: String,
    },

    /// Target element could not be resolved.
    #[error("Locator error: {0}")]
    Locator(#[from] LocatorError),

    /// Non-retryable driver failure.
    #[error("Driver error: {0}")]
    Driver(DriverError),

    /// Action/target combination that can never succeed.
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    /// Execution was cancelled externally.
    #[error("Execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Short machine-readable tag for reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Exhausted { .. } => "exhausted",
            ExecutionError::Locator(_) => "locator",
            ExecutionError::Driver(_) => "driver",
            ExecutionError::InvalidStep(_) => "invalid_step",
            ExecutionError::Cancelled => "cancelled",
        }
    }

    /// Whether the underlying session is unusable for further steps.
    pub fn is_fatal(&self) -> bool {
        match self {
            ExecutionError::Driver(err) => err.is_fatal(),
            ExecutionError::Locator(err) => err.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message() {
        let err = ExecutionError::Exhausted {
            action: "click".to_string(),
            attempts: 3,
            last_cause: "stale element handle".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("stale element handle"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ExecutionError::Driver(DriverError::PageGone("crashed".into())).is_fatal());
        assert!(!ExecutionError::Cancelled.is_fatal());
        assert!(!ExecutionError::Exhausted {
            action: "fill".into(),
            attempts: 3,
            last_cause: "stale".into(),
        }
        .is_fatal());
    }
}
