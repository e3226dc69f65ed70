//! Browser session assembly
//!
//! Wires one Chromium instance to the resolver, executor, verifier and
//! orchestrator stack. A session is exclusive: one flow runs on it at a
//! time.

use std::sync::Arc;

use action_executor::{DefaultInteractionExecutor, ExecutorConfig};
use cdp_driver::{CdpDriver, CdpDriverConfig, DriverError, PageDriver};
use element_locator::DefaultElementResolver;
use flow_orchestrator::{DefaultFlowOrchestrator, Flow, FlowOrchestrator, FlowResult};
use postcondition_gate::DefaultVerifier;
use shopflow_core_types::SessionId;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::HarnessConfig;

/// One live browser session with its orchestration stack.
pub struct Session {
    id: SessionId,
    driver: Arc<CdpDriver>,
    orchestrator: DefaultFlowOrchestrator,
}

impl Session {
    /// Launch a browser and assemble the harness around it.
    pub async fn launch(config: &HarnessConfig) -> Result<Self, DriverError> {
        let id = SessionId::new();
        info!(session = %id, headless = config.headless, "launching browser session");

        let driver = Arc::new(
            CdpDriver::launch(CdpDriverConfig {
                headless: config.headless,
                ..Default::default()
            })
            .await?,
        );

        let orchestrator = Self::assemble(driver.clone(), config);
        Ok(Self {
            id,
            driver,
            orchestrator,
        })
    }

    /// Build the orchestration stack over an existing driver.
    pub fn assemble(
        driver: Arc<dyn PageDriver>,
        config: &HarnessConfig,
    ) -> DefaultFlowOrchestrator {
        let resolver = Arc::new(DefaultElementResolver::new(driver.clone()));
        let executor = Arc::new(DefaultInteractionExecutor::with_config(
            driver.clone(),
            resolver,
            ExecutorConfig {
                resolve_timeout: config.step_timeout(),
            },
        ));
        let verifier = Arc::new(DefaultVerifier::new(driver.clone()));
        DefaultFlowOrchestrator::new(driver, executor, verifier)
            .with_artifacts_dir(&config.artifacts_dir)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Run one flow on this session.
    pub async fn run(&self, flow: &Flow, cancel: &CancellationToken) -> FlowResult {
        self.orchestrator.run(flow, cancel).await
    }

    /// Shut the browser down.
    pub async fn close(self) {
        info!(session = %self.id, "closing browser session");
        self.driver.close().await;
    }
}
