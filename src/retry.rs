use crate::scrapers::AdapterState;
use std::collections::HashMap;
use std::time::Duration;

/// How often a failing adapter step is retried before giving up
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// After retries are exhausted, restart once from the entry point
    pub hard_refresh: bool,
    /// State name → retry count, overriding `max_retries`
    pub per_state: HashMap<String, u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            hard_refresh: true,
            per_state: HashMap::new(),
        }
    }
}

impl RetryPolicy {
    /// No retries, no hard refresh
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            hard_refresh: false,
            ..Self::default()
        }
    }

    pub fn retries_for(&self, state: &AdapterState) -> u32 {
        self.per_state
            .get(state.name())
            .copied()
            .unwrap_or(self.max_retries)
    }

    /// Wait before retry number `attempt` (1-based): doubles each time, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}
