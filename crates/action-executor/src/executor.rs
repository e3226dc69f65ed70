//! Default executor with transient-failure retries

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_driver::{DriverError, PageDriver};
use element_locator::{Descriptor, ElementResolver, LocatorError};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ExecutionError;
use crate::types::{Ack, Action, RetryPolicy};

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Per-attempt budget for resolving the target element.
    pub resolve_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: Duration::from_secs(10),
        }
    }
}

/// Interaction executor trait
#[async_trait]
pub trait InteractionExecutor: Send + Sync {
    /// Perform one action against an optionally targeted element.
    ///
    /// Transient driver failures consume one attempt each and trigger a
    /// fresh resolution of the target; deterministic failures are returned
    /// without touching the retry budget further.
    async fn execute(
        &self,
        target: Option<&Descriptor>,
        action: &Action,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Ack, ExecutionError>;
}

/// Default executor over a driver session and a resolver.
pub struct DefaultInteractionExecutor {
    driver: Arc<dyn PageDriver>,
    resolver: Arc<dyn ElementResolver>,
    config: ExecutorConfig,
}

impl DefaultInteractionExecutor {
    pub fn new(driver: Arc<dyn PageDriver>, resolver: Arc<dyn ElementResolver>) -> Self {
        Self {
            driver,
            resolver,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(
        driver: Arc<dyn PageDriver>,
        resolver: Arc<dyn ElementResolver>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            driver,
            resolver,
            config,
        }
    }

    /// One attempt: resolve (when targeted), then act.
    ///
    /// Returns the selector that resolved the target so the caller can
    /// report which strategy won.
    async fn attempt(
        &self,
        target: Option<&Descriptor>,
        action: &Action,
        cancel: &CancellationToken,
    ) -> Result<Option<cdp_driver::Selector>, AttemptError> {
        match action {
            Action::Navigate { url } => {
                self.driver
                    .navigate(url)
                    .await
                    .map_err(AttemptError::from_driver)?;
                Ok(None)
            }
            Action::Click | Action::Fill { .. } => {
                let descriptor = target.ok_or_else(|| {
                    AttemptError::Deterministic(ExecutionError::InvalidStep(format!(
                        "{} requires a target element",
                        action.kind()
                    )))
                })?;
                let resolved = self
                    .resolver
                    .resolve(descriptor, self.config.resolve_timeout, cancel)
                    .await
                    .map_err(AttemptError::from_locator)?;
                let result = match action {
                    Action::Click => self.driver.click(resolved.handle).await,
                    Action::Fill { text } => self.driver.fill(resolved.handle, text).await,
                    Action::Navigate { .. } => unreachable!(),
                };
                result.map_err(AttemptError::from_driver)?;
                Ok(Some(resolved.selector))
            }
        }
    }
}

/// Per-attempt failure, split by whether another attempt is worthwhile.
enum AttemptError {
    Transient(DriverError),
    Deterministic(ExecutionError),
}

impl AttemptError {
    fn from_driver(err: DriverError) -> Self {
        if err.is_transient() {
            AttemptError::Transient(err)
        } else {
            AttemptError::Deterministic(ExecutionError::Driver(err))
        }
    }

    fn from_locator(err: LocatorError) -> Self {
        match err {
            LocatorError::Cancelled => AttemptError::Deterministic(ExecutionError::Cancelled),
            other => AttemptError::Deterministic(ExecutionError::Locator(other)),
        }
    }
}

#[async_trait]
impl InteractionExecutor for DefaultInteractionExecutor {
    async fn execute(
        &self,
        target: Option<&Descriptor>,
        action: &Action,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Ack, ExecutionError> {
        let max_attempts = policy.max_attempts.max(1);
        let started = Instant::now();
        let mut last_cause = String::new();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }

            match self.attempt(target, action, cancel).await {
                Ok(resolved_by) => {
                    debug!(
                        action = action.kind(),
                        attempt,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "action succeeded"
                    );
                    return Ok(Ack {
                        attempts: attempt,
                        resolved_by,
                        latency_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Err(AttemptError::Deterministic(err)) => return Err(err),
                Err(AttemptError::Transient(err)) => {
                    warn!(
                        action = action.kind(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "transient failure, will re-resolve and retry"
                    );
                    last_cause = err.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
                    _ = sleep(policy.backoff(attempt)) => {}
                }
            }
        }

        Err(ExecutionError::Exhausted {
            action: action.kind().to_string(),
            attempts: max_attempts,
            last_cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_driver::{Selector, StubDriver, StubElement, StubPage};
    use element_locator::{DefaultElementResolver, ResolverConfig};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(10),
            factor: 2,
            cap: Duration::from_millis(40),
        }
    }

    fn executor_for(driver: StubDriver) -> (Arc<StubDriver>, DefaultInteractionExecutor) {
        let driver = Arc::new(driver);
        let resolver = Arc::new(DefaultElementResolver::with_config(
            driver.clone(),
            ResolverConfig {
                poll_interval: Duration::from_millis(20),
                default_timeout: Duration::from_millis(500),
            },
        ));
        let executor = DefaultInteractionExecutor::with_config(
            driver.clone(),
            resolver,
            ExecutorConfig {
                resolve_timeout: Duration::from_millis(200),
            },
        );
        (driver, executor)
    }

    #[tokio::test]
    async fn test_click_retries_through_transient_failures() {
        // Two stale-handle failures, then success: the third attempt lands
        // and the ack reports all three.
        let (_, executor) = executor_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/item",
        )
        .with_element(
            StubElement::new("add-to-cart")
                .matched_by(Selector::text("Add to cart"))
                .failing_clicks(2),
        )]));

        let descriptor = Descriptor::new("add to cart button").text("Add to cart");
        let ack = executor
            .execute(
                Some(&descriptor),
                &Action::Click,
                &fast_policy(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(ack.attempts, 3);
        assert_eq!(ack.resolved_by, Some(Selector::text("Add to cart")));
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let (_, executor) = executor_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/item",
        )
        .with_element(
            StubElement::new("add-to-cart")
                .matched_by(Selector::text("Add to cart"))
                .failing_clicks(5),
        )]));

        let descriptor = Descriptor::new("add to cart button").text("Add to cart");
        let err = executor
            .execute(
                Some(&descriptor),
                &Action::Click,
                &fast_policy(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            ExecutionError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_navigate_needs_no_descriptor() {
        let (driver, executor) = executor_for(StubDriver::new(vec![
            StubPage::new("https://shop.test/"),
            StubPage::new("https://shop.test/signin"),
        ]));

        let ack = executor
            .execute(
                None,
                &Action::Navigate {
                    url: "https://shop.test/signin".into(),
                },
                &RetryPolicy::none(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(ack.attempts, 1);
        assert!(ack.resolved_by.is_none());
        assert_eq!(
            driver.current_url().await.unwrap(),
            "https://shop.test/signin"
        );
    }

    #[tokio::test]
    async fn test_click_without_target_is_invalid() {
        let (_, executor) = executor_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/",
        )]));
        let err = executor
            .execute(
                None,
                &Action::Click,
                &RetryPolicy::none(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidStep(_)));
    }

    #[tokio::test]
    async fn test_fill_overwrites_previous_value() {
        let (driver, executor) = executor_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/search",
        )
        .with_element(
            StubElement::new("search-box")
                .matched_by(Selector::css("#gh-ac"))
                .with_value("old query"),
        )]));

        let descriptor = Descriptor::new("search box").css("#gh-ac");
        executor
            .execute(
                Some(&descriptor),
                &Action::Fill {
                    text: "chair".into(),
                },
                &RetryPolicy::none(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let handle = driver.query(&Selector::css("#gh-ac")).await.unwrap()[0].handle;
        assert_eq!(driver.value(handle).await.unwrap(), "chair");
    }

    #[tokio::test]
    async fn test_fatal_driver_error_is_not_retried() {
        let (driver, executor) = executor_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/item",
        )
        .with_element(StubElement::new("button").matched_by(Selector::css("#btn")))]));
        driver.crash();

        let descriptor = Descriptor::new("button").css("#btn");
        let err = executor
            .execute(
                Some(&descriptor),
                &Action::Click,
                &fast_policy(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        // Exactly one query hit the dead page; no retry loop ran.
        assert_eq!(driver.queries_for(&Selector::css("#btn")), 1);
    }

    #[tokio::test]
    async fn test_cancelled_during_backoff() {
        let (_, executor) = executor_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/item",
        )
        .with_element(
            StubElement::new("button")
                .matched_by(Selector::css("#btn"))
                .failing_clicks(5),
        )]));

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(15)).await;
            cancel_clone.cancel();
        });

        let descriptor = Descriptor::new("button").css("#btn");
        let err = executor
            .execute(
                Some(&descriptor),
                &Action::Click,
                &RetryPolicy {
                    max_attempts: 5,
                    base_backoff: Duration::from_millis(100),
                    factor: 2,
                    cap: Duration::from_secs(2),
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Cancelled));
    }
}
