//! Search flow
//!
//! Home page, query, submit, results; with a price ceiling configured,
//! results are then filtered to it. The add-to-cart flow reuses these
//! steps as its preamble.

use flow_orchestrator::{Flow, FlowStep};
use postcondition_gate::{PostCondition, Predicate};

use crate::config::HarnessConfig;
use crate::flows::selectors;

/// Render a price ceiling the way a shopper would type it.
pub(crate) fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}

/// The search steps, ending on a (possibly price-filtered) results page.
pub(crate) fn steps(config: &HarnessConfig) -> Vec<FlowStep> {
    let step_timeout = config.step_timeout();
    let mut steps = vec![
        FlowStep::navigate(
            "open home page",
            &config.base_url,
            PostCondition::new(
                Predicate::ElementPresent(selectors::search_box()),
                step_timeout,
            ),
        ),
        FlowStep::fill(
            "enter search query",
            selectors::search_box(),
            &config.search_term,
            // The query is not secret, so the fill is verified exactly.
            PostCondition::new(
                Predicate::ValueEquals {
                    descriptor: selectors::search_box(),
                    expected: config.search_term.clone(),
                },
                step_timeout,
            ),
        ),
        FlowStep::click(
            "run search",
            selectors::search_button(),
            PostCondition::new(
                Predicate::ElementPresent(selectors::results_heading()),
                step_timeout * 2,
            ),
        ),
    ];

    if let Some(max_price) = config.max_price {
        steps.push(FlowStep::fill(
            "set price ceiling",
            selectors::max_price_input(),
            format_price(max_price),
            PostCondition::new(
                Predicate::ValueNotEmpty(selectors::max_price_input()),
                step_timeout,
            ),
        ));
        steps.push(FlowStep::click(
            "apply price filter",
            selectors::price_filter_button(),
            // The filter reloads the results with the ceiling in the URL.
            PostCondition::new(
                Predicate::All(vec![
                    Predicate::UrlContains("_udhi".to_string()),
                    Predicate::ElementPresent(selectors::results_heading()),
                ]),
                step_timeout * 2,
            ),
        ));
    }

    steps
}

pub fn flow(config: &HarnessConfig) -> Flow {
    let mut flow = Flow::new("search").with_timeout(config.flow_timeout());
    for step in steps(config) {
        flow = flow.step(step);
    }
    flow
}
