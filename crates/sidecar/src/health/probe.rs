//! Backend readiness polling with exponential backoff.

use crate::clock::SharedClock;
use crate::health::{HealthCheckConfig, HealthReport, Readiness};
use crate::port::HOST;
use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::time::Duration;

use error_location::ErrorLocation;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

pub const HEALTH_PATH: &str = "/healthz";

/// Outcome of one health request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attempt {
    Healthy,
    Status(u16),
    Failed(String),
}

pub struct HealthProbe {
    client: reqwest::Client,
    clock: SharedClock,
    attempt_timeout: Duration,
}

impl HealthProbe {
    /// Create a probe whose single-shot checks use `attempt_timeout`.
    pub fn new(clock: SharedClock, attempt_timeout: Duration) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            clock,
            attempt_timeout,
        })
    }

    /// Exactly one health request, no retry.
    pub async fn check_once(&self, port: u16) -> HealthReport {
        let attempt = self.attempt(port, self.attempt_timeout).await;
        let (ready, status_code, error) = match attempt {
            Attempt::Healthy => (true, Some(StatusCode::OK.as_u16()), None),
            Attempt::Status(code) => (false, Some(code), None),
            Attempt::Failed(error) => (false, None, Some(error)),
        };

        HealthReport {
            ready,
            port: Some(port),
            status_code,
            error,
        }
    }

    /// Poll the health endpoint until it answers 200 or the budget is spent.
    ///
    /// The deadline is checked before every retry and the final sleep is
    /// cut short at the deadline, so the call returns within
    /// `max_wait + attempt_timeout`.
    pub async fn wait_until_ready(
        &self,
        port: u16,
        config: &HealthCheckConfig,
    ) -> SupervisorResult<Readiness> {
        let start = self.clock.now();
        let deadline = start + config.max_wait;
        let mut retry_delay = config.initial_retry_delay;
        let mut retry_delays = Vec::new();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let attempt = self.attempt(port, config.attempt_timeout).await;

            if attempt == Attempt::Healthy {
                let elapsed = self.clock.now() - start;
                info!("Backend on port {port} healthy after {attempts} attempts ({elapsed:?})");
                return Ok(Readiness {
                    attempts,
                    retry_delays,
                    elapsed,
                });
            }

            let now = self.clock.now();
            if now >= deadline {
                let waited = now - start;
                warn!("Backend on port {port} still unhealthy after {attempts} attempts: {attempt:?}");
                return Err(SupervisorError::HealthCheckTimeout {
                    port,
                    attempts,
                    waited_ms: waited.as_millis() as u64,
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            debug!("Health attempt {attempts} on port {port} failed: {attempt:?}, retrying in {retry_delay:?}");
            retry_delays.push(retry_delay);
            self.clock.sleep(retry_delay.min(deadline - now)).await;
            retry_delay = config.next_delay(retry_delay);
        }
    }

    async fn attempt(&self, port: u16, timeout: Duration) -> Attempt {
        let url = format!("http://{HOST}:{port}{HEALTH_PATH}");

        match self.client.get(&url).timeout(timeout).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => Attempt::Healthy,
            Ok(resp) => Attempt::Status(resp.status().as_u16()),
            Err(e) if e.is_timeout() => Attempt::Failed(format!("timed out after {timeout:?}")),
            Err(e) => Attempt::Failed(e.to_string()),
        }
    }
}
