//! Exponential backoff for transient transport failures.

use std::time::Duration;

/// How often and how patiently a failed request is re-sent.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
        }
    }
}

/// Maps a retry number to the delay before it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Delay before retry number `retry` (1-based); `None` once the budget is spent.
    pub fn next_delay(&self, retry: u32) -> Option<Duration> {
        if !(1..=self.config.max_retries).contains(&retry) {
            return None;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let scale = self.config.factor.max(1.0).powi(exponent);
        let delay = Duration::try_from_secs_f64(self.config.base_delay.as_secs_f64() * scale)
            .unwrap_or(self.config.max_delay);
        Some(delay.min(self.config.max_delay))
    }

    /// Sum of every backoff sleep when all retries are used.
    pub fn total_delay(&self) -> Duration {
        (1..=self.max_retries())
            .filter_map(|n| self.next_delay(n))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
