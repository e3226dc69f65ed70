//! Element resolution with ordered fallback strategies.
//!
//! A [`Descriptor`] names one logical UI element ("the sign-in button") and
//! carries an ordered list of [`Selector`] strategies for finding it. The
//! [`ElementResolver`] walks the list left to right, polling, until one
//! strategy matches exactly one visible, enabled element or the timeout
//! elapses.

pub mod errors;
pub mod resolver;
pub mod types;

pub use cdp_driver::Selector;
pub use errors::LocatorError;
pub use resolver::{DefaultElementResolver, ElementResolver};
pub use types::{Descriptor, Resolved, ResolverConfig};
