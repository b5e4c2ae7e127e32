use std::time::Duration;

use serde::Serialize;

/// Result of a single health request, as handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub port: Option<u16>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn not_running() -> Self {
        Self {
            ready: false,
            port: None,
            status_code: None,
            error: Some("backend not running".into()),
        }
    }
}

/// Evidence of a successful [`wait_until_ready`](super::HealthProbe::wait_until_ready).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub attempts: u32,
    /// Backoff delays scheduled between attempts, before deadline clamping
    pub retry_delays: Vec<Duration>,
    pub elapsed: Duration,
}
