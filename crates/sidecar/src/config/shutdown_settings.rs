use crate::config::{
    default_grace_timeout, default_kill_exit_wait, default_panic_timeout,
    default_release_poll_interval, default_release_wait, default_shutdown_request_timeout,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownSettings {
    /// Time the backend gets to exit after a graceful request (milliseconds)
    #[serde(default = "default_grace_timeout")]
    pub grace_timeout_ms: u64,

    /// Timeout of the HTTP shutdown request itself (milliseconds)
    #[serde(default = "default_shutdown_request_timeout")]
    pub request_timeout_ms: u64,

    /// Poll interval while waiting for the port to be released (milliseconds)
    #[serde(default = "default_release_poll_interval")]
    pub release_poll_interval_ms: u64,

    /// Total wait for the port to be released (milliseconds)
    #[serde(default = "default_release_wait")]
    pub release_wait_ms: u64,

    /// Wait for the OS to report exit after a forced kill (milliseconds)
    #[serde(default = "default_kill_exit_wait")]
    pub kill_exit_wait_ms: u64,

    /// Budget for the forced stop run from the panic hook (milliseconds)
    #[serde(default = "default_panic_timeout")]
    pub panic_timeout_ms: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_timeout_ms: default_grace_timeout(),
            request_timeout_ms: default_shutdown_request_timeout(),
            release_poll_interval_ms: default_release_poll_interval(),
            release_wait_ms: default_release_wait(),
            kill_exit_wait_ms: default_kill_exit_wait(),
            panic_timeout_ms: default_panic_timeout(),
        }
    }
}

impl ShutdownSettings {
    pub fn grace_timeout(&self) -> Duration {
        Duration::from_millis(self.grace_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn release_poll_interval(&self) -> Duration {
        Duration::from_millis(self.release_poll_interval_ms)
    }

    pub fn release_wait(&self) -> Duration {
        Duration::from_millis(self.release_wait_ms)
    }

    pub fn kill_exit_wait(&self) -> Duration {
        Duration::from_millis(self.kill_exit_wait_ms)
    }

    pub fn panic_timeout(&self) -> Duration {
        Duration::from_millis(self.panic_timeout_ms)
    }
}
