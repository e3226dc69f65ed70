//! Browser driver layer for the shopflow harness.
//!
//! Everything above this crate talks to the page through the [`PageDriver`]
//! trait: a small, read-mostly surface (navigate, query, click, fill,
//! current URL, screenshot). Two implementations are provided:
//!
//! - [`CdpDriver`]: drives a real Chromium instance over the DevTools
//!   protocol via `chromiumoxide`.
//! - [`StubDriver`] (feature `stub`, on by default): a deterministic
//!   scripted page model with a recorded call log, used by tests across the
//!   workspace.

pub mod cdp;
pub mod driver;
pub mod errors;
#[cfg(feature = "stub")]
pub mod stub;
pub mod types;

pub use cdp::{CdpDriver, CdpDriverConfig};
pub use driver::PageDriver;
pub use errors::DriverError;
#[cfg(feature = "stub")]
pub use stub::{ClickEffect, DriverCall, StubDriver, StubElement, StubPage};
pub use types::{ElementHandle, ElementHit, ElementState, Selector};
