use crate::config::{
    default_attempt_timeout, default_initial_retry_delay, default_max_retry_delay,
    default_max_wait,
};
use crate::health::HealthCheckConfig;

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Timeout for a single health request (milliseconds)
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_ms: u64,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,

    /// Backoff cap (milliseconds)
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,

    /// Total startup health budget (milliseconds)
    #[serde(default = "default_max_wait")]
    pub max_wait_ms: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout(),
            initial_retry_delay_ms: default_initial_retry_delay(),
            max_retry_delay_ms: default_max_retry_delay(),
            max_wait_ms: default_max_wait(),
        }
    }
}

impl From<&HealthSettings> for HealthCheckConfig {
    fn from(settings: &HealthSettings) -> Self {
        Self {
            attempt_timeout: Duration::from_millis(settings.attempt_timeout_ms),
            initial_retry_delay: Duration::from_millis(settings.initial_retry_delay_ms),
            max_retry_delay: Duration::from_millis(settings.max_retry_delay_ms),
            max_wait: Duration::from_millis(settings.max_wait_ms),
        }
    }
}
