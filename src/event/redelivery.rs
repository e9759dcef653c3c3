//! Redelivery policy with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::EventsConfig;

/// How often, and how late, a failed message is handed to its handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    /// Redeliveries after the first attempt.
    pub max_redeliveries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RedeliveryPolicy {
    pub fn from_config(config: &EventsConfig) -> Self {
        Self {
            max_redeliveries: config.max_redeliveries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Whether a message that failed on `attempt` (0 = first delivery) gets another try.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_redeliveries
    }

    /// Delay before redelivery number `redelivery` (1-based).
    pub fn delay_for(&self, redelivery: u32) -> Duration {
        if redelivery == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exponential_base = 2u64.saturating_pow(redelivery - 1);
        let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

        // Jitter of 0 to 10% of the delay
        let jitter_range = capped_delay / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped_delay + jitter)
    }
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self::from_config(&EventsConfig::default())
    }
}
