//! Single-step interaction execution with bounded retries.
//!
//! The [`InteractionExecutor`] turns a resolved element plus an [`Action`]
//! into a browser interaction, retrying transient failures (stale handles,
//! mid-flight DOM churn) with exponential backoff and re-resolving the
//! target between attempts. Deterministic failures are surfaced immediately.

pub mod errors;
pub mod executor;
pub mod types;

pub use errors::ExecutionError;
pub use executor::{DefaultInteractionExecutor, ExecutorConfig, InteractionExecutor};
pub use types::{Ack, Action, RetryPolicy};
