use std::time::Duration;

/// Immutable health polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Timeout of one health request
    pub attempt_timeout: Duration,
    /// Delay before the first retry, doubled after every failure
    pub initial_retry_delay: Duration,
    /// Backoff cap
    pub max_retry_delay: Duration,
    /// Budget measured from the first attempt
    pub max_wait: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(1500),
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_millis(4000),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl HealthCheckConfig {
    /// Delay following `current`, doubled and capped.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_retry_delay)
    }
}
