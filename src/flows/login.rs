//! Login flow
//!
//! Two-phase sign-in: username, continue, password, submit. The site may
//! interpose a CAPTCHA after the continue step; when a captcha gate is
//! supplied, the flow accepts an operator signal as an alternative way of
//! reaching the password phase.

use flow_orchestrator::{Flow, FlowStep};
use postcondition_gate::{OperatorGate, PostCondition, Predicate};

use crate::config::HarnessConfig;
use crate::flows::selectors;

pub fn flow(config: &HarnessConfig, captcha_gate: Option<OperatorGate>) -> Flow {
    let step_timeout = config.step_timeout();

    let password_reachable = Predicate::ElementPresent(selectors::password_field());
    let continue_post = match captcha_gate {
        Some(gate) => Predicate::Any(vec![
            password_reachable,
            Predicate::OperatorSignal(gate),
        ]),
        None => password_reachable,
    };

    let signed_in = Predicate::Any(vec![
        Predicate::ElementPresent(selectors::account_greeting()),
        Predicate::UrlContains("myebay".to_string()),
    ]);

    Flow::new("login")
        .with_timeout(config.flow_timeout())
        .step(FlowStep::navigate(
            "open sign-in page",
            &config.signin_url,
            PostCondition::new(
                Predicate::ElementPresent(selectors::username_field()),
                step_timeout,
            ),
        ))
        .step(FlowStep::fill(
            "enter username",
            selectors::username_field(),
            &config.credentials.username,
            PostCondition::new(
                Predicate::ValueNotEmpty(selectors::username_field()),
                step_timeout,
            ),
        ))
        .step(FlowStep::click(
            "continue to password",
            selectors::continue_button(),
            PostCondition::new(continue_post, step_timeout * 3),
        ))
        // The password never appears in a post-condition: the check is
        // only that the field is non-empty.
        .step(FlowStep::fill(
            "enter password",
            selectors::password_field(),
            config.credentials.password(),
            PostCondition::new(
                Predicate::ValueNotEmpty(selectors::password_field()),
                step_timeout,
            ),
        ))
        .step(FlowStep::click(
            "submit sign-in",
            selectors::signin_button(),
            PostCondition::new(signed_in, step_timeout * 2),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_executor::Action;

    #[test]
    fn test_login_flow_shape() {
        let config = HarnessConfig::default();
        let flow = flow(&config, None);
        assert_eq!(flow.name, "login");
        assert_eq!(flow.steps.len(), 5);
        assert!(matches!(flow.steps[0].action, Action::Navigate { .. }));
        assert!(matches!(flow.steps[3].action, Action::Fill { .. }));
        assert!(matches!(flow.steps[4].action, Action::Click));
    }

    #[test]
    fn test_captcha_gate_widens_the_continue_condition() {
        let config = HarnessConfig::default();
        let (_handle, gate) = OperatorGate::pair();
        let gated = flow(&config, Some(gate));
        match &gated.steps[2].post.predicate {
            Predicate::Any(alternatives) => {
                assert!(alternatives
                    .iter()
                    .any(|p| matches!(p, Predicate::OperatorSignal(_))));
            }
            other => panic!("expected Any, got {other:?}"),
        }

        let ungated = flow(&config, None);
        assert!(matches!(
            ungated.steps[2].post.predicate,
            Predicate::ElementPresent(_)
        ));
    }
}
