//! Profile email validation flow
//!
//! Opens the account profile page and checks the contact email: it must be
//! present, and when an expected address is known it must match exactly.

use flow_orchestrator::{Flow, FlowStep};
use postcondition_gate::{PostCondition, Predicate};

use crate::config::HarnessConfig;
use crate::flows::selectors;

pub fn flow(config: &HarnessConfig) -> Flow {
    let email_check = match config.expected_email() {
        Some(expected) => Predicate::TextEquals {
            descriptor: selectors::profile_email(),
            expected: expected.to_string(),
        },
        None => Predicate::ElementPresent(selectors::profile_email()),
    };

    Flow::new("profile")
        .with_timeout(config.flow_timeout())
        .step(FlowStep::navigate(
            "open profile page",
            &config.profile_url,
            PostCondition::new(
                Predicate::All(vec![
                    Predicate::UrlContains("profile".to_string()),
                    email_check,
                ]),
                config.step_timeout(),
            ),
        ))
}
