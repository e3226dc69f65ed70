//! Post-condition verification.
//!
//! After an action is dispatched, the [`PostConditionVerifier`] polls the
//! page until the step's declared [`Predicate`] holds or its timeout
//! elapses. The four terminal outcomes are kept distinct: satisfied, timed
//! out, errored (the page or browser failed) and cancelled, because each
//! calls for a different reaction from the orchestrator.

pub mod errors;
pub mod types;
pub mod verifier;

pub use errors::VerifyError;
pub use types::{OperatorGate, OperatorHandle, PostCondition, Predicate, Satisfied};
pub use verifier::{DefaultVerifier, PostConditionVerifier, VerifierConfig};
