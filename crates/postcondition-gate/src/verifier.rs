//! Default verifier with page-state polling

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_driver::{DriverError, ElementHandle, PageDriver};
use element_locator::Descriptor;
use futures::future::BoxFuture;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::VerifyError;
use crate::types::{PostCondition, Predicate, Satisfied};

/// Verifier tuning knobs.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Interval between predicate evaluations.
    pub poll_interval: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(150),
        }
    }
}

/// Post-condition verifier trait
#[async_trait]
pub trait PostConditionVerifier: Send + Sync {
    /// Block until the condition holds, its timeout elapses, observation
    /// fails fatally, or `cancel` fires.
    ///
    /// Verification is idempotent: it only observes the page, so verifying
    /// an already-satisfied condition again succeeds immediately.
    async fn verify(
        &self,
        condition: &PostCondition,
        cancel: &CancellationToken,
    ) -> Result<Satisfied, VerifyError>;
}

/// Default verifier over a driver session.
pub struct DefaultVerifier {
    driver: Arc<dyn PageDriver>,
    config: VerifierConfig,
}

impl DefaultVerifier {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            config: VerifierConfig::default(),
        }
    }

    pub fn with_config(driver: Arc<dyn PageDriver>, config: VerifierConfig) -> Self {
        Self { driver, config }
    }

    /// First visible element matching any of the descriptor's selectors.
    async fn first_visible(
        &self,
        descriptor: &Descriptor,
    ) -> Result<Option<ElementHandle>, DriverError> {
        for selector in &descriptor.selectors {
            match self.driver.query(selector).await {
                Ok(hits) => {
                    if let Some(hit) = hits.iter().find(|hit| hit.state.visible) {
                        return Ok(Some(hit.handle));
                    }
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => {}
            }
        }
        Ok(None)
    }

    /// One evaluation of a predicate against the current page.
    ///
    /// Fatal driver errors abort verification; anything transient reads as
    /// "not yet" so the poll loop keeps going.
    fn eval<'a>(&'a self, predicate: &'a Predicate) -> BoxFuture<'a, Result<bool, DriverError>> {
        Box::pin(async move {
            match predicate {
                Predicate::UrlEquals(url) => {
                    Ok(observed(self.driver.current_url().await)?.is_some_and(|u| u == *url))
                }
                Predicate::UrlStartsWith(prefix) => Ok(observed(self.driver.current_url().await)?
                    .is_some_and(|u| u.starts_with(prefix))),
                Predicate::UrlContains(fragment) => Ok(observed(self.driver.current_url().await)?
                    .is_some_and(|u| u.contains(fragment))),
                Predicate::TitleContains(fragment) => {
                    Ok(observed(self.driver.title().await)?.is_some_and(|t| t.contains(fragment)))
                }
                Predicate::ElementPresent(descriptor) => {
                    Ok(self.first_visible(descriptor).await?.is_some())
                }
                Predicate::ElementAbsent(descriptor) => {
                    Ok(self.first_visible(descriptor).await?.is_none())
                }
                Predicate::TextEquals {
                    descriptor,
                    expected,
                } => match self.first_visible(descriptor).await? {
                    Some(handle) => Ok(observed(self.driver.text(handle).await)?
                        .is_some_and(|t| t.trim() == expected.trim())),
                    None => Ok(false),
                },
                Predicate::ValueEquals {
                    descriptor,
                    expected,
                } => match self.first_visible(descriptor).await? {
                    Some(handle) => {
                        Ok(observed(self.driver.value(handle).await)?.is_some_and(|v| v == *expected))
                    }
                    None => Ok(false),
                },
                Predicate::ValueNotEmpty(descriptor) => {
                    match self.first_visible(descriptor).await? {
                        Some(handle) => Ok(observed(self.driver.value(handle).await)?
                            .is_some_and(|v| !v.trim().is_empty())),
                        None => Ok(false),
                    }
                }
                Predicate::NumberAtMost { descriptor, limit } => {
                    match self.first_visible(descriptor).await? {
                        Some(handle) => Ok(observed(self.driver.text(handle).await)?
                            .and_then(|t| parse_amount(&t))
                            .is_some_and(|amount| amount <= *limit)),
                        None => Ok(false),
                    }
                }
                Predicate::All(inner) => {
                    for predicate in inner {
                        if !self.eval(predicate).await? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Predicate::Any(inner) => {
                    for predicate in inner {
                        if self.eval(predicate).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Predicate::Not(inner) => Ok(!self.eval(inner).await?),
                Predicate::OperatorSignal(gate) => Ok(gate.is_open()),
            }
        })
    }
}

/// First number in a money-like display string.
///
/// "US $1,234.56" reads as 1234.56; text with no digits reads as nothing.
fn parse_amount(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    token.trim_end_matches('.').parse().ok()
}

/// Screen a driver observation: fatal errors propagate, transient ones
/// read as "nothing observed".
fn observed<T>(result: Result<T, DriverError>) -> Result<Option<T>, DriverError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(_) => Ok(None),
    }
}

#[async_trait]
impl PostConditionVerifier for DefaultVerifier {
    async fn verify(
        &self,
        condition: &PostCondition,
        cancel: &CancellationToken,
    ) -> Result<Satisfied, VerifyError> {
        let started = Instant::now();

        // An operator signal is edge-triggered; await the gate directly
        // instead of polling the page.
        if let Predicate::OperatorSignal(gate) = &condition.predicate {
            tokio::select! {
                _ = gate.opened() => {
                    return Ok(Satisfied {
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }
                _ = cancel.cancelled() => return Err(VerifyError::Cancelled),
                _ = sleep(condition.timeout) => {
                    return Err(VerifyError::TimedOut {
                        condition: condition.predicate.describe(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        let deadline = started + condition.timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(VerifyError::Cancelled);
            }

            match self.eval(&condition.predicate).await {
                Ok(true) => {
                    let waited_ms = started.elapsed().as_millis() as u64;
                    debug!(condition = %condition.predicate.describe(), waited_ms, "condition satisfied");
                    return Ok(Satisfied { waited_ms });
                }
                Ok(false) => {}
                Err(source) => return Err(VerifyError::Errored { source }),
            }

            if Instant::now() + self.config.poll_interval > deadline {
                return Err(VerifyError::TimedOut {
                    condition: condition.predicate.describe(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(VerifyError::Cancelled),
                _ = sleep(self.config.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperatorGate;
    use cdp_driver::{Selector, StubDriver, StubElement, StubPage};

    fn verifier_for(driver: StubDriver) -> (Arc<StubDriver>, DefaultVerifier) {
        let driver = Arc::new(driver);
        let verifier = DefaultVerifier::with_config(
            driver.clone(),
            VerifierConfig {
                poll_interval: Duration::from_millis(20),
            },
        );
        (driver, verifier)
    }

    fn cart_page() -> StubPage {
        StubPage::new("https://shop.test/cart")
            .with_title("Shopping cart")
            .with_element(
                StubElement::new("cart-count")
                    .matched_by(Selector::css(".cart-count"))
                    .with_text("1"),
            )
    }

    #[tokio::test]
    async fn test_satisfied_condition_and_idempotent_reverify() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        let condition = PostCondition::new(
            Predicate::All(vec![
                Predicate::UrlContains("/cart".into()),
                Predicate::TextEquals {
                    descriptor: Descriptor::new("cart count").css(".cart-count"),
                    expected: "1".into(),
                },
            ]),
            Duration::from_millis(300),
        );

        let cancel = CancellationToken::new();
        let first = verifier.verify(&condition, &cancel).await.unwrap();
        assert!(first.waited_ms < 200);
        // Observation only: verifying again succeeds the same way.
        verifier.verify(&condition, &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_never_true_condition_times_out() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        let condition = PostCondition::new(
            Predicate::ElementPresent(Descriptor::new("missing banner").css(".banner")),
            Duration::from_millis(150),
        );

        let started = Instant::now();
        let err = verifier
            .verify(&condition, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            VerifyError::TimedOut { condition, .. } => {
                assert!(condition.contains("missing banner"));
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_late_element_satisfies_within_budget() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/results",
        )
        .with_element(
            StubElement::new("results-heading")
                .matched_by(Selector::css(".results-count"))
                .with_text("214 results")
                .appears_after(Duration::from_millis(100)),
        )]));

        let condition = PostCondition::new(
            Predicate::ElementPresent(Descriptor::new("results heading").css(".results-count")),
            Duration::from_millis(400),
        );
        let satisfied = verifier
            .verify(&condition, &CancellationToken::new())
            .await
            .unwrap();
        assert!(satisfied.waited_ms >= 80);
        assert!(satisfied.waited_ms < 400);
    }

    #[tokio::test]
    async fn test_page_failure_is_errored_not_timed_out() {
        let (driver, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        driver.crash();

        let condition = PostCondition::new(
            Predicate::UrlContains("/cart".into()),
            Duration::from_secs(5),
        );
        let started = Instant::now();
        let err = verifier
            .verify(&condition, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Errored { .. }));
        // Errored short-circuits; it does not burn the whole timeout.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancel_wins_over_timeout() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            cancel_clone.cancel();
        });

        let condition = PostCondition::new(
            Predicate::ElementPresent(Descriptor::new("never").css(".never")),
            Duration::from_secs(10),
        );
        let err = verifier.verify(&condition, &cancel).await.unwrap_err();
        assert!(matches!(err, VerifyError::Cancelled));
    }

    #[tokio::test]
    async fn test_value_not_empty() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/profile",
        )
        .with_element(
            StubElement::new("email-field")
                .matched_by(Selector::css("input[type='email']"))
                .with_value("buyer@example.com"),
        )
        .with_element(
            StubElement::new("nickname-field").matched_by(Selector::css("input[name='nick']")),
        )]));

        let filled = PostCondition::new(
            Predicate::ValueNotEmpty(Descriptor::new("email field").css("input[type='email']")),
            Duration::from_millis(100),
        );
        verifier
            .verify(&filled, &CancellationToken::new())
            .await
            .unwrap();

        let empty = PostCondition::new(
            Predicate::ValueNotEmpty(Descriptor::new("nickname field").css("input[name='nick']")),
            Duration::from_millis(100),
        );
        let err = verifier
            .verify(&empty, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::TimedOut { .. }));
    }

    #[test]
    fn test_parse_amount_handles_currency_markup() {
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("US $89.00"), Some(89.0));
        assert_eq!(parse_amount("120"), Some(120.0));
        assert_eq!(parse_amount("Your cart is empty"), None);
    }

    #[tokio::test]
    async fn test_number_at_most_reads_the_subtotal() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![StubPage::new(
            "https://shop.test/cart",
        )
        .with_element(
            StubElement::new("subtotal")
                .matched_by(Selector::css("[data-test-id='SUBTOTAL']"))
                .with_text("US $120.99"),
        )]));
        let subtotal = Descriptor::new("cart subtotal").css("[data-test-id='SUBTOTAL']");

        let under = PostCondition::new(
            Predicate::NumberAtMost {
                descriptor: subtotal.clone(),
                limit: 150.0,
            },
            Duration::from_millis(100),
        );
        verifier
            .verify(&under, &CancellationToken::new())
            .await
            .unwrap();

        let over = PostCondition::new(
            Predicate::NumberAtMost {
                descriptor: subtotal,
                limit: 100.0,
            },
            Duration::from_millis(100),
        );
        let err = verifier
            .verify(&over, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            VerifyError::TimedOut { condition, .. } => {
                assert!(condition.contains("number <= 100"));
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_operator_signal_awaits_the_gate() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        let (handle, gate) = OperatorGate::pair();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            handle.open();
        });

        let condition = PostCondition::new(
            Predicate::OperatorSignal(gate),
            Duration::from_millis(500),
        );
        let satisfied = verifier
            .verify(&condition, &CancellationToken::new())
            .await
            .unwrap();
        assert!(satisfied.waited_ms >= 30);
    }

    #[tokio::test]
    async fn test_operator_signal_times_out_when_never_opened() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        let (_handle, gate) = OperatorGate::pair();
        let condition =
            PostCondition::new(Predicate::OperatorSignal(gate), Duration::from_millis(80));
        let err = verifier
            .verify(&condition, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_negation_and_disjunction() {
        let (_, verifier) = verifier_for(StubDriver::new(vec![cart_page()]));
        let condition = PostCondition::new(
            Predicate::Any(vec![
                Predicate::UrlContains("/checkout".into()),
                Predicate::Not(Box::new(Predicate::ElementPresent(
                    Descriptor::new("error banner").css(".error"),
                ))),
            ]),
            Duration::from_millis(200),
        );
        verifier
            .verify(&condition, &CancellationToken::new())
            .await
            .unwrap();
    }
}
