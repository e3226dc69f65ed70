//! Run reporting
//!
//! Serializes flow results into a timestamped JSON report under the
//! artifacts directory and mirrors a human-readable summary into the log.
//! Reports carry step outcomes and failure causes only; action payloads
//! (and with them any credentials) never appear.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flow_orchestrator::{FlowResult, StepStatus};
use serde::Serialize;
use tracing::{error, info};

/// Top-level shape of a report file.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub passed: usize,
    pub failed: usize,
    pub flows: &'a [FlowResult],
}

impl<'a> RunReport<'a> {
    pub fn new(flows: &'a [FlowResult]) -> Self {
        let passed = flows.iter().filter(|f| f.succeeded()).count();
        Self {
            generated_at: Utc::now(),
            passed,
            failed: flows.len() - passed,
            flows,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Write the report as pretty JSON; returns the path written.
pub async fn write_report(results: &[FlowResult], dir: &Path) -> io::Result<PathBuf> {
    let report = RunReport::new(results);
    let filename = format!("report-{}.json", Utc::now().format("%Y%m%dT%H%M%S"));
    let path = dir.join(filename);

    tokio::fs::create_dir_all(dir).await?;
    let json = serde_json::to_vec_pretty(&report)?;
    tokio::fs::write(&path, json).await?;
    info!(path = %path.display(), "run report written");
    Ok(path)
}

/// Log one line per flow and a totals line.
pub fn log_summary(results: &[FlowResult]) {
    for result in results {
        let completed = result
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        if result.succeeded() {
            info!(
                flow = %result.flow_name,
                steps = result.steps.len(),
                "flow passed"
            );
        } else {
            let failed_step = result
                .steps
                .iter()
                .find(|s| s.status == StepStatus::Failed);
            error!(
                flow = %result.flow_name,
                completed,
                failed_step = failed_step.map(|s| s.name.as_str()).unwrap_or("-"),
                cause = failed_step
                    .and_then(|s| s.failure.as_ref())
                    .map(|f| f.message.as_str())
                    .unwrap_or("cancelled before any step"),
                "flow failed"
            );
        }
    }
    let report = RunReport::new(results);
    info!(passed = report.passed, failed = report.failed, "run finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flow_orchestrator::{FlowState, StepOutcome};
    use shopflow_core_types::{FlowId, StepId};

    fn fake_result(state: FlowState) -> FlowResult {
        FlowResult {
            flow_id: FlowId::new(),
            flow_name: "login".to_string(),
            state,
            steps: vec![StepOutcome {
                step_id: StepId::new("enter-password"),
                name: "enter password".to_string(),
                action: "fill".to_string(),
                status: if state == FlowState::Completed {
                    StepStatus::Completed
                } else {
                    StepStatus::Failed
                },
                attempts: 1,
                resolved_by: Some("css=#pass".to_string()),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                latency_ms: 12,
                failure: None,
                screenshot: None,
            }],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_report_written_and_counts_correct() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            fake_result(FlowState::Completed),
            fake_result(FlowState::StepFailed),
        ];

        let path = write_report(&results, dir.path()).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["passed"], 1);
        assert_eq!(parsed["failed"], 1);
        assert_eq!(parsed["flows"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_all_passed() {
        let results = vec![fake_result(FlowState::Completed)];
        assert!(RunReport::new(&results).all_passed());
        let results = vec![fake_result(FlowState::StepFailed)];
        assert!(!RunReport::new(&results).all_passed());
    }
}
