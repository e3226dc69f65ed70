//! Shopflow: a resilient UI automation harness for e-commerce sites.
//!
//! The library side of the `shopflow` binary: configuration, session
//! assembly, the built-in flow catalog and run reporting. The underlying
//! machinery lives in the workspace crates (`element-locator`,
//! `action-executor`, `postcondition-gate`, `flow-orchestrator`).

pub mod config;
pub mod flows;
pub mod report;
pub mod session;
