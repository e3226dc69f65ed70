//! Built-in flow catalog
//!
//! Each module builds one scripted shopping flow against the configured
//! storefront. Selector chains live in [`selectors`]; flows only decide the
//! ordering of steps and the post-condition each one must satisfy.

pub mod cart;
pub mod login;
pub mod profile;
pub mod search;
pub(crate) mod selectors;

use flow_orchestrator::Flow;
use postcondition_gate::OperatorGate;

use crate::config::HarnessConfig;

/// Names accepted by `shopflow run <flow>`, in suite order.
pub const FLOW_NAMES: &[&str] = &["login", "profile", "search", "cart"];

/// Look a flow up by name.
///
/// `captcha_gate` is only consulted by the login flow; the others ignore it.
pub fn by_name(
    name: &str,
    config: &HarnessConfig,
    captcha_gate: Option<OperatorGate>,
) -> Option<Flow> {
    match name {
        "login" => Some(login::flow(config, captcha_gate)),
        "profile" => Some(profile::flow(config)),
        "search" => Some(search::flow(config)),
        "cart" => Some(cart::flow(config)),
        _ => None,
    }
}

/// The full suite, in dependency order (login first).
pub fn suite(config: &HarnessConfig, captcha_gate: Option<OperatorGate>) -> Vec<Flow> {
    vec![
        login::flow(config, captcha_gate),
        profile::flow(config),
        search::flow(config),
        cart::flow(config),
    ]
}
