//! Flow, step and result types

use std::time::Duration;

use action_executor::{Action, RetryPolicy};
use chrono::{DateTime, Utc};
use element_locator::Descriptor;
use postcondition_gate::PostCondition;
use serde::Serialize;
use shopflow_core_types::{ArtifactRef, FlowId, StepId};

/// One step of a flow: an action, its optional target, the post-condition
/// that defines success, and the retry budget for the action itself.
#[derive(Debug, Clone)]
pub struct FlowStep {
    pub id: StepId,
    pub name: String,
    pub target: Option<Descriptor>,
    pub action: Action,
    pub post: PostCondition,
    pub retry: RetryPolicy,
}

impl FlowStep {
    pub fn navigate(name: impl Into<String>, url: impl Into<String>, post: PostCondition) -> Self {
        let name = name.into();
        Self {
            id: StepId::new(slug(&name)),
            name,
            target: None,
            action: Action::Navigate { url: url.into() },
            post,
            retry: RetryPolicy::default(),
        }
    }

    pub fn click(name: impl Into<String>, target: Descriptor, post: PostCondition) -> Self {
        let name = name.into();
        Self {
            id: StepId::new(slug(&name)),
            name,
            target: Some(target),
            action: Action::Click,
            post,
            retry: RetryPolicy::default(),
        }
    }

    pub fn fill(
        name: impl Into<String>,
        target: Descriptor,
        text: impl Into<String>,
        post: PostCondition,
    ) -> Self {
        let name = name.into();
        Self {
            id: StepId::new(slug(&name)),
            name,
            target: Some(target),
            action: Action::Fill { text: text.into() },
            post,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Kebab-case step id derived from a human name.
pub(crate) fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// An ordered sequence of steps with an overall wall-clock budget.
#[derive(Debug, Clone)]
pub struct Flow {
    pub id: FlowId,
    pub name: String,
    pub steps: Vec<FlowStep>,
    pub timeout: Duration,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FlowId::new(),
            name: name.into(),
            steps: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn step(mut self, step: FlowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Lifecycle of one flow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Pending,
    Running,
    StepFailed,
    Completed,
}

/// Terminal status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
    /// Never started because an earlier step failed.
    Skipped,
}

/// What went wrong, in a shape fit for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct FailureCause {
    /// Machine-readable tag ("exhausted", "timed_out", ...).
    pub kind: String,
    pub message: String,
}

/// Structured record of one step's run.
///
/// Action payloads are deliberately absent: fill text may hold credentials
/// and must never reach the report.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step_id: StepId,
    pub name: String,
    pub action: String,
    pub status: StepStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ArtifactRef>,
}

/// Structured record of one flow run.
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    pub flow_id: FlowId,
    pub flow_name: String,
    pub state: FlowState,
    pub steps: Vec<StepOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FlowResult {
    pub fn succeeded(&self) -> bool {
        self.state == FlowState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postcondition_gate::Predicate;

    #[test]
    fn test_flow_builder_keeps_step_order() {
        let flow = Flow::new("login")
            .step(FlowStep::navigate(
                "open sign-in page",
                "https://shop.test/signin",
                PostCondition::within_default(Predicate::UrlContains("signin".into())),
            ))
            .step(FlowStep::click(
                "submit",
                Descriptor::new("submit button").css("#sgnBt"),
                PostCondition::within_default(Predicate::UrlContains("home".into())),
            ));
        assert_eq!(flow.steps.len(), 2);
        assert_eq!(flow.steps[0].name, "open sign-in page");
        assert!(flow.steps[0].target.is_none());
        assert!(flow.steps[1].target.is_some());
    }

    #[test]
    fn test_slug_is_kebab_case() {
        assert_eq!(slug("Open sign-in page"), "open-sign-in-page");
        assert_eq!(slug("submit!"), "submit");
    }

    #[test]
    fn test_step_outcome_serialization_omits_payloads() {
        let outcome = StepOutcome {
            step_id: StepId::new("enter-password"),
            name: "enter password".to_string(),
            action: "fill".to_string(),
            status: StepStatus::Completed,
            attempts: 1,
            resolved_by: Some("css=#pass".to_string()),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            latency_ms: 42,
            failure: None,
            screenshot: None,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"completed\""));
        assert!(!json.contains("failure"));
        assert!(!json.contains("screenshot"));
    }
}
