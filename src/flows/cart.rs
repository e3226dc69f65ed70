//! Add-to-cart flow
//!
//! Search, open the first result, add it to the cart. Taking the first
//! result keeps runs reproducible; the item itself does not matter, only
//! that the cart ends up non-empty. With a price ceiling configured, the
//! flow finishes on the cart page and checks the total stayed under it.

use flow_orchestrator::{Flow, FlowStep};
use postcondition_gate::{PostCondition, Predicate};

use crate::config::HarnessConfig;
use crate::flows::{search, selectors};

pub fn flow(config: &HarnessConfig) -> Flow {
    let step_timeout = config.step_timeout();
    let mut flow = Flow::new("cart").with_timeout(config.flow_timeout());
    for step in search::steps(config) {
        flow = flow.step(step);
    }
    flow = flow
        .step(FlowStep::click(
            "open first result",
            selectors::first_result_link(),
            PostCondition::new(
                Predicate::ElementPresent(selectors::add_to_cart_button()),
                step_timeout * 2,
            ),
        ))
        .step(FlowStep::click(
            "add to cart",
            selectors::add_to_cart_button(),
            PostCondition::new(
                Predicate::Any(vec![
                    Predicate::ElementPresent(selectors::cart_count()),
                    Predicate::UrlContains("cart".to_string()),
                ]),
                step_timeout * 2,
            ),
        ));

    if let Some(max_price) = config.max_price {
        flow = flow.step(FlowStep::navigate(
            "check cart total",
            &config.cart_url,
            PostCondition::new(
                Predicate::NumberAtMost {
                    descriptor: selectors::cart_subtotal(),
                    limit: max_price,
                },
                step_timeout * 2,
            ),
        ));
    }

    flow
}
