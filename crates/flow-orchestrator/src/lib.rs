//! Flow orchestration.
//!
//! A [`Flow`] is an ordered list of steps, each an action plus the
//! post-condition that must hold before the next step may run. The
//! [`FlowOrchestrator`] drives the sequence, short-circuits on the first
//! failure, captures a screenshot for diagnostics and reports a structured
//! [`FlowResult`].

pub mod orchestrator;
pub mod types;

pub use orchestrator::{DefaultFlowOrchestrator, FlowOrchestrator};
pub use types::{FailureCause, Flow, FlowResult, FlowState, FlowStep, StepOutcome, StepStatus};
