//! Element resolver with fallback chain polling

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_driver::{DriverError, PageDriver};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::LocatorError;
use crate::types::{Descriptor, Resolved, ResolverConfig};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve a descriptor to a unique visible, enabled element.
    ///
    /// Polls the fallback chain until one selector matches exactly one
    /// interactable element, the timeout elapses, or `cancel` fires.
    async fn resolve(
        &self,
        descriptor: &Descriptor,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resolved, LocatorError>;
}

/// Default resolver implementation over a driver session.
pub struct DefaultElementResolver {
    driver: Arc<dyn PageDriver>,
    config: ResolverConfig,
}

impl DefaultElementResolver {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(driver: Arc<dyn PageDriver>, config: ResolverConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// One pass over the fallback chain.
    ///
    /// Returns the first selector that matches exactly one visible, enabled
    /// element. A selector matching more than one interactable element is a
    /// failure for that selector, not a success: acting on an arbitrary
    /// member of an ambiguous match set risks clicking the wrong thing.
    async fn try_chain(&self, descriptor: &Descriptor) -> Result<Option<Resolved>, LocatorError> {
        for (index, selector) in descriptor.selectors.iter().enumerate() {
            match self.driver.query(selector).await {
                Ok(hits) => {
                    let interactable: Vec<_> = hits
                        .iter()
                        .filter(|hit| hit.state.interactable())
                        .collect();
                    match interactable.len() {
                        1 => {
                            return Ok(Some(Resolved {
                                handle: interactable[0].handle,
                                selector: selector.clone(),
                                selector_index: index,
                                elapsed: Duration::ZERO,
                            }));
                        }
                        0 => {
                            debug!(
                                element = %descriptor.name,
                                selector = %selector,
                                matched = hits.len(),
                                "selector matched no interactable element"
                            );
                        }
                        n => {
                            debug!(
                                element = %descriptor.name,
                                selector = %selector,
                                matched = n,
                                "ambiguous match, skipping selector"
                            );
                        }
                    }
                }
                Err(DriverError::InvalidSelector(reason)) => {
                    // A broken selector never matches; keep walking the chain.
                    warn!(
                        element = %descriptor.name,
                        selector = %selector,
                        %reason,
                        "selector failed to evaluate"
                    );
                }
                Err(err) if err.is_fatal() => return Err(LocatorError::Driver(err)),
                Err(err) => {
                    debug!(
                        element = %descriptor.name,
                        selector = %selector,
                        error = %err,
                        "transient driver error during query"
                    );
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    async fn resolve(
        &self,
        descriptor: &Descriptor,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resolved, LocatorError> {
        if descriptor.is_empty() {
            return Err(LocatorError::EmptyDescriptor(descriptor.name.clone()));
        }

        debug!(element = %descriptor.name, strategies = descriptor.selectors.len(), "resolving element");
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(LocatorError::Cancelled);
            }

            if let Some(mut resolved) = self.try_chain(descriptor).await? {
                resolved.elapsed = started.elapsed();
                debug!(
                    element = %descriptor.name,
                    selector = %resolved.selector,
                    elapsed_ms = resolved.elapsed.as_millis() as u64,
                    "element resolved"
                );
                return Ok(resolved);
            }

            if Instant::now() + self.config.poll_interval > deadline {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    element = %descriptor.name,
                    elapsed_ms,
                    "all strategies exhausted"
                );
                return Err(LocatorError::NotFound {
                    descriptor: descriptor.name.clone(),
                    tried: descriptor
                        .selectors
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                    elapsed_ms,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(LocatorError::Cancelled),
                _ = sleep(self.config.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_driver::{ClickEffect, Selector, StubDriver, StubElement, StubPage};

    fn resolver_for(driver: StubDriver) -> (Arc<StubDriver>, DefaultElementResolver) {
        let driver = Arc::new(driver);
        let resolver = DefaultElementResolver::with_config(
            driver.clone(),
            ResolverConfig {
                poll_interval: Duration::from_millis(20),
                default_timeout: Duration::from_millis(500),
            },
        );
        (driver, resolver)
    }

    #[tokio::test]
    async fn test_resolves_via_fallback_strategy() {
        // First strategy (test id) is absent from the page; the text
        // strategy matches.
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/signin",
        )
        .with_element(
            StubElement::new("submit")
                .matched_by(Selector::text("Log in"))
                .on_click(ClickEffect::default()),
        )]));

        let descriptor = Descriptor::new("login submit button")
            .test_id("login-submit")
            .text("Log in");

        let resolved = resolver
            .resolve(
                &descriptor,
                Duration::from_millis(300),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resolved.selector, Selector::text("Log in"));
        assert_eq!(resolved.selector_index, 1);
    }

    #[tokio::test]
    async fn test_not_found_reports_tried_strategies() {
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/empty",
        )]));

        let descriptor = Descriptor::new("missing element")
            .css("#nope")
            .text("Nothing");

        let err = resolver
            .resolve(
                &descriptor,
                Duration::from_millis(100),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            LocatorError::NotFound {
                descriptor, tried, ..
            } => {
                assert_eq!(descriptor, "missing element");
                assert_eq!(tried, vec!["css=#nope", "text=Nothing"]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ambiguous_match_fails_the_selector() {
        // Two visible buttons match the same css selector; the unique text
        // selector later in the chain should win instead.
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/list",
        )
        .with_element(StubElement::new("first").matched_by(Selector::css(".btn")))
        .with_element(StubElement::new("second").matched_by(Selector::css(".btn")))
        .with_element(StubElement::new("unique").matched_by(Selector::text("Checkout")))]));

        let descriptor = Descriptor::new("checkout button")
            .css(".btn")
            .text("Checkout");

        let resolved = resolver
            .resolve(
                &descriptor,
                Duration::from_millis(300),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resolved.selector, Selector::text("Checkout"));
    }

    #[tokio::test]
    async fn test_hidden_and_disabled_elements_do_not_match() {
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/form",
        )
        .with_element(
            StubElement::new("hidden-input")
                .matched_by(Selector::css("#field"))
                .hidden(),
        )
        .with_element(
            StubElement::new("disabled-input")
                .matched_by(Selector::css("#other"))
                .disabled(),
        )]));

        let descriptor = Descriptor::new("form field").css("#field").css("#other");
        let err = resolver
            .resolve(
                &descriptor,
                Duration::from_millis(100),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_waits_for_late_element() {
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/results",
        )
        .with_element(
            StubElement::new("results")
                .matched_by(Selector::css(".results"))
                .appears_after(Duration::from_millis(80)),
        )]));

        let descriptor = Descriptor::new("results list").css(".results");
        let resolved = resolver
            .resolve(
                &descriptor,
                Duration::from_millis(500),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(resolved.elapsed >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_cancel_aborts_polling() {
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/empty",
        )]));
        let cancel = CancellationToken::new();
        let descriptor = Descriptor::new("never").css("#never");

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(40)).await;
            cancel_clone.cancel();
        });

        let started = Instant::now();
        let err = resolver
            .resolve(&descriptor, Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_descriptor_is_rejected() {
        let (_, resolver) = resolver_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/empty",
        )]));
        let err = resolver
            .resolve(
                &Descriptor::new("nothing"),
                Duration::from_millis(50),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::EmptyDescriptor(_)));
    }
}
