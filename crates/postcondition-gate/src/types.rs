//! Post-condition and predicate types

use std::time::Duration;

use element_locator::Descriptor;
use tokio::sync::watch;

/// A predicate over observable page state.
///
/// Predicates are pure observations: evaluating one never mutates the page.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Current URL equals the string exactly.
    UrlEquals(String),

    /// Current URL starts with the prefix.
    UrlStartsWith(String),

    /// Current URL contains the fragment.
    UrlContains(String),

    /// Document title contains the fragment.
    TitleContains(String),

    /// At least one visible element matches any of the descriptor's
    /// selectors.
    ElementPresent(Descriptor),

    /// No visible element matches any of the descriptor's selectors.
    ElementAbsent(Descriptor),

    /// The first visible match's trimmed text equals the expectation.
    TextEquals {
        descriptor: Descriptor,
        expected: String,
    },

    /// The first visible match's input value equals the expectation.
    ValueEquals {
        descriptor: Descriptor,
        expected: String,
    },

    /// The first visible match's input value is non-empty.
    ValueNotEmpty(Descriptor),

    /// The first number in the first visible match's text is at most the
    /// limit. Currency symbols and thousands separators are ignored, so
    /// "$1,234.56" reads as 1234.56. Non-numeric text never satisfies.
    NumberAtMost { descriptor: Descriptor, limit: f64 },

    /// Every sub-predicate holds.
    All(Vec<Predicate>),

    /// At least one sub-predicate holds.
    Any(Vec<Predicate>),

    /// The sub-predicate does not hold.
    Not(Box<Predicate>),

    /// A human operator has signalled completion of an out-of-band step
    /// (a CAPTCHA, a one-time code). Satisfied once the gate opens.
    OperatorSignal(OperatorGate),
}

impl Predicate {
    /// Short description for timeout diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Predicate::UrlEquals(url) => format!("url == {url}"),
            Predicate::UrlStartsWith(prefix) => format!("url starts with {prefix}"),
            Predicate::UrlContains(fragment) => format!("url contains {fragment}"),
            Predicate::TitleContains(fragment) => format!("title contains {fragment}"),
            Predicate::ElementPresent(descriptor) => format!("'{}' present", descriptor.name),
            Predicate::ElementAbsent(descriptor) => format!("'{}' absent", descriptor.name),
            Predicate::TextEquals { descriptor, .. } => {
                format!("'{}' text matches", descriptor.name)
            }
            Predicate::ValueEquals { descriptor, .. } => {
                format!("'{}' value matches", descriptor.name)
            }
            Predicate::ValueNotEmpty(descriptor) => {
                format!("'{}' value non-empty", descriptor.name)
            }
            Predicate::NumberAtMost { descriptor, limit } => {
                format!("'{}' number <= {limit}", descriptor.name)
            }
            Predicate::All(inner) => format!("all of {} predicates", inner.len()),
            Predicate::Any(inner) => format!("any of {} predicates", inner.len()),
            Predicate::Not(inner) => format!("not ({})", inner.describe()),
            Predicate::OperatorSignal(_) => "operator signal".to_string(),
        }
    }
}

/// A declarative post-condition: a predicate plus the time it gets.
#[derive(Debug, Clone)]
pub struct PostCondition {
    pub predicate: Predicate,
    pub timeout: Duration,
}

impl PostCondition {
    pub fn new(predicate: Predicate, timeout: Duration) -> Self {
        Self { predicate, timeout }
    }

    /// Common case: the predicate with a 10s budget.
    pub fn within_default(predicate: Predicate) -> Self {
        Self::new(predicate, Duration::from_secs(10))
    }
}

/// Read side of an operator signal.
///
/// The gate starts closed; the paired [`OperatorHandle`] opens it once the
/// operator has completed the out-of-band step. Opening is one-way.
#[derive(Clone)]
pub struct OperatorGate {
    rx: watch::Receiver<bool>,
}

/// Write side of an operator signal.
#[derive(Debug, Clone)]
pub struct OperatorHandle {
    tx: watch::Sender<bool>,
}

impl OperatorGate {
    /// Create a closed gate and the handle that opens it.
    pub fn pair() -> (OperatorHandle, OperatorGate) {
        let (tx, rx) = watch::channel(false);
        (OperatorHandle { tx }, OperatorGate { rx })
    }

    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the gate opens.
    ///
    /// If the handle is dropped without opening, this pends forever; the
    /// caller's timeout decides when to give up.
    pub async fn opened(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl OperatorHandle {
    /// Open the gate. Idempotent.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }
}

impl std::fmt::Debug for OperatorGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorGate")
            .field("open", &self.is_open())
            .finish()
    }
}

/// Proof that a condition held, with how long the wait took.
#[derive(Debug, Clone, Copy)]
pub struct Satisfied {
    pub waited_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_starts_closed_and_opens_once() {
        let (handle, gate) = OperatorGate::pair();
        assert!(!gate.is_open());
        handle.open();
        assert!(gate.is_open());
        handle.open();
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn test_opened_resolves_after_signal() {
        let (handle, gate) = OperatorGate::pair();
        let waiter = tokio::spawn(async move { gate.opened().await });
        handle.open();
        waiter.await.unwrap();
    }

    #[test]
    fn test_describe_is_compact() {
        let predicate = Predicate::Not(Box::new(Predicate::UrlContains("signin".into())));
        assert_eq!(predicate.describe(), "not (url contains signin)");
    }
}
