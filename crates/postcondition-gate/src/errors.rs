//! Error types for post-condition verification

use cdp_driver::DriverError;
use thiserror::Error;

/// Verification error enumeration
///
/// `TimedOut`, `Errored` and `Cancelled` are deliberately distinct
/// variants: a timeout means the page never reached the expected state, an
/// error means we could no longer observe the page at all, and a
/// cancellation means somebody upstream gave up first.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The predicate never held within the budget.
    #[error("Condition not met after {waited_ms}ms: {condition}")]
    TimedOut { condition: String, waited_ms: u64 },

    /// The page or browser failed while observing.
    #[error("Verification errored: {source}")]
    Errored {
        #[source]
        source: DriverError,
    },

    /// Verification was cancelled externally.
    #[error("Verification cancelled")]
    Cancelled,
}

impl VerifyError {
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::TimedOut { .. } => "timed_out",
            VerifyError::Errored { .. } => "errored",
            VerifyError::Cancelled => "cancelled",
        }
    }
}
