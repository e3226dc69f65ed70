//! Action and retry-policy types

use std::time::Duration;

use cdp_driver::Selector;
use serde::{Deserialize, Serialize};

/// A single UI interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Click the target element.
    Click,

    /// Replace the target input's value with `text` (clear, then type).
    Fill { text: String },

    /// Drive the page to a URL; needs no target element.
    Navigate { url: String },
}

impl Action {
    /// Whether this action operates on a resolved element.
    pub fn needs_target(&self) -> bool {
        !matches!(self, Action::Navigate { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Fill { .. } => "fill",
            Action::Navigate { .. } => "navigate",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Click => write!(f, "click"),
            Action::Fill { text } => write!(f, "fill ({} chars)", text.len()),
            Action::Navigate { url } => write!(f, "navigate to {url}"),
        }
    }
}

/// Retry budget and backoff shape for one interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(with = "duration_millis")]
    pub base_backoff: Duration,

    /// Multiplier applied per retry.
    pub factor: u32,

    /// Upper bound on any single delay.
    #[serde(with = "duration_millis")]
    pub cap: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Backoff before retry number `retry` (1-based), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let factor = u64::from(self.factor).max(1).saturating_pow(exponent);
        let delay = self
            .base_backoff
            .saturating_mul(factor.min(u64::from(u32::MAX)) as u32);
        delay.min(self.cap)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            factor: 2,
            cap: Duration::from_secs(2),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Acknowledgement of a completed interaction.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    /// Attempts consumed, including the successful one.
    pub attempts: u32,

    /// Selector that resolved the target on the winning attempt, if any.
    pub resolved_by: Option<Selector>,

    /// Wall time from dispatch to success.
    pub latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(4), Duration::from_millis(1600));
        // Capped from here on.
        assert_eq!(policy.backoff(5), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), Duration::from_secs(2));
    }

    #[test]
    fn test_navigate_needs_no_target() {
        assert!(!Action::Navigate {
            url: "https://shop.test".into()
        }
        .needs_target());
        assert!(Action::Click.needs_target());
        assert!(Action::Fill {
            text: "chair".into()
        }
        .needs_target());
    }

    #[test]
    fn test_fill_display_hides_payload() {
        let action = Action::Fill {
            text: "hunter2".into(),
        };
        let rendered = action.to_string();
        assert!(!rendered.contains("hunter2"));
    }
}
