//! Default orchestrator: sequential execution with short-circuit on failure

use std::path::PathBuf;
use std::sync::Arc;

use action_executor::InteractionExecutor;
use async_trait::async_trait;
use cdp_driver::PageDriver;
use chrono::Utc;
use postcondition_gate::PostConditionVerifier;
use shopflow_core_types::ArtifactRef;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::types::{
    slug, FailureCause, Flow, FlowResult, FlowState, FlowStep, StepOutcome, StepStatus,
};

/// Flow orchestrator trait
#[async_trait]
pub trait FlowOrchestrator: Send + Sync {
    /// Run a flow to completion or first failure.
    ///
    /// Always returns a result; failures are recorded in it rather than
    /// surfaced as errors, so a suite runner can keep going.
    async fn run(&self, flow: &Flow, cancel: &CancellationToken) -> FlowResult;
}

/// Default orchestrator over one browser session.
pub struct DefaultFlowOrchestrator {
    driver: Arc<dyn PageDriver>,
    executor: Arc<dyn InteractionExecutor>,
    verifier: Arc<dyn PostConditionVerifier>,
    /// Where failure screenshots land; `None` disables capture.
    artifacts_dir: Option<PathBuf>,
}

impl DefaultFlowOrchestrator {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        executor: Arc<dyn InteractionExecutor>,
        verifier: Arc<dyn PostConditionVerifier>,
    ) -> Self {
        Self {
            driver,
            executor,
            verifier,
            artifacts_dir: None,
        }
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    /// Run one step: dispatch the action, then gate on its post-condition.
    async fn run_step(
        &self,
        flow: &Flow,
        step: &FlowStep,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let started_at = Utc::now();
        let started = tokio::time::Instant::now();
        info!(flow = %flow.name, step = %step.id, action = step.action.kind(), "step started");

        let (status, attempts, resolved_by, failure) = match self
            .executor
            .execute(step.target.as_ref(), &step.action, &step.retry, cancel)
            .await
        {
            Ok(ack) => match self.verifier.verify(&step.post, cancel).await {
                Ok(_) => (
                    StepStatus::Completed,
                    ack.attempts,
                    ack.resolved_by.map(|s| s.to_string()),
                    None,
                ),
                Err(err) => (
                    StepStatus::Failed,
                    ack.attempts,
                    ack.resolved_by.map(|s| s.to_string()),
                    Some(FailureCause {
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    }),
                ),
            },
            Err(err) => (
                StepStatus::Failed,
                0,
                None,
                Some(FailureCause {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }),
            ),
        };

        let screenshot = if status == StepStatus::Failed {
            self.capture_failure(flow, step).await
        } else {
            None
        };

        if let Some(cause) = &failure {
            error!(
                flow = %flow.name,
                step = %step.id,
                kind = %cause.kind,
                message = %cause.message,
                "step failed"
            );
        } else {
            info!(
                flow = %flow.name,
                step = %step.id,
                attempts,
                latency_ms = started.elapsed().as_millis() as u64,
                "step completed"
            );
        }

        StepOutcome {
            step_id: step.id.clone(),
            name: step.name.clone(),
            action: step.action.kind().to_string(),
            status,
            attempts,
            resolved_by,
            started_at,
            finished_at: Utc::now(),
            latency_ms: started.elapsed().as_millis() as u64,
            failure,
            screenshot,
        }
    }

    /// Best-effort screenshot of the page at the moment of failure.
    ///
    /// Capture problems are logged, never escalated: the step already
    /// failed and the diagnostic must not mask the original cause.
    async fn capture_failure(&self, flow: &Flow, step: &FlowStep) -> Option<ArtifactRef> {
        let dir = self.artifacts_dir.as_ref()?;
        let bytes = match self.driver.screenshot().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(step = %step.id, error = %err, "failure screenshot unavailable");
                return None;
            }
        };
        let filename = format!(
            "{}-{}-{}.png",
            slug(&flow.name),
            step.id,
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        let path = dir.join(&filename);
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!(step = %step.id, error = %err, "could not create artifacts directory");
            return None;
        }
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => {
                info!(step = %step.id, path = %path.display(), "failure screenshot captured");
                Some(ArtifactRef::new(filename, step.id.to_string()))
            }
            Err(err) => {
                warn!(step = %step.id, error = %err, "could not write screenshot");
                None
            }
        }
    }
}

#[async_trait]
impl FlowOrchestrator for DefaultFlowOrchestrator {
    async fn run(&self, flow: &Flow, cancel: &CancellationToken) -> FlowResult {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(flow.steps.len());

        info!(flow = %flow.name, steps = flow.steps.len(), "flow started");
        let mut state = FlowState::Running;

        // The flow budget cancels every in-flight wait, not just the loop.
        let flow_cancel = cancel.child_token();
        let guard_cancel = flow_cancel.clone();
        let budget = flow.timeout;
        let guard = tokio::spawn(async move {
            sleep(budget).await;
            guard_cancel.cancel();
        });

        for (index, step) in flow.steps.iter().enumerate() {
            if flow_cancel.is_cancelled() {
                state = FlowState::StepFailed;
                outcomes.push(StepOutcome {
                    step_id: step.id.clone(),
                    name: step.name.clone(),
                    action: step.action.kind().to_string(),
                    status: StepStatus::Skipped,
                    attempts: 0,
                    resolved_by: None,
                    started_at: Utc::now(),
                    finished_at: Utc::now(),
                    latency_ms: 0,
                    failure: Some(FailureCause {
                        kind: "cancelled".to_string(),
                        message: "flow budget exhausted or run cancelled".to_string(),
                    }),
                    screenshot: None,
                });
                break;
            }

            let outcome = self.run_step(flow, step, &flow_cancel).await;
            let failed = outcome.status == StepStatus::Failed;
            outcomes.push(outcome);

            if failed {
                state = FlowState::StepFailed;
                // Steps are cumulative; anything after the break never ran.
                for skipped in &flow.steps[index + 1..] {
                    outcomes.push(StepOutcome {
                        step_id: skipped.id.clone(),
                        name: skipped.name.clone(),
                        action: skipped.action.kind().to_string(),
                        status: StepStatus::Skipped,
                        attempts: 0,
                        resolved_by: None,
                        started_at: Utc::now(),
                        finished_at: Utc::now(),
                        latency_ms: 0,
                        failure: None,
                        screenshot: None,
                    });
                }
                break;
            }
        }

        guard.abort();

        if state == FlowState::Running {
            state = FlowState::Completed;
        }
        info!(flow = %flow.name, state = ?state, "flow finished");

        FlowResult {
            flow_id: flow.id.clone(),
            flow_name: flow.name.clone(),
            state,
            steps: outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
