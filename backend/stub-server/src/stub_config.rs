//! Settings read from the environment the supervisor prepares.

use crate::error::{Result as StubResult, StubError};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use sidecar::process::{ENV_PORT, ENV_SUPERVISOR_PID, ENV_WORKSPACE_DIR};

/// Health answers 503 until this much time has passed since start
pub const ENV_READY_DELAY_MS: &str = "SIDECAR_STUB_READY_DELAY_MS";
/// Acknowledge shutdown requests without acting on them
pub const ENV_IGNORE_SHUTDOWN: &str = "SIDECAR_STUB_IGNORE_SHUTDOWN";
/// Exit with a failure code after this delay, as if crashed
pub const ENV_EXIT_AFTER_MS: &str = "SIDECAR_STUB_EXIT_AFTER_MS";
pub const ENV_LOG_LEVEL: &str = "SIDECAR_STUB_LOG_LEVEL";

const DEFAULT_SUPERVISOR_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct StubConfig {
    pub port: u16,
    pub supervisor_pid: Option<u32>,
    pub workspace_dir: Option<PathBuf>,
    pub ready_delay: Duration,
    pub ignore_shutdown: bool,
    pub exit_after: Option<Duration>,
    pub log_level: LevelFilter,
    pub supervisor_poll: Duration,
}

impl StubConfig {
    pub fn from_env() -> StubResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StubResult<Self> {
        let port = required::<u16>(&lookup, ENV_PORT)?;
        let supervisor_pid = optional::<u32>(&lookup, ENV_SUPERVISOR_PID)?;
        let ready_delay = optional::<u64>(&lookup, ENV_READY_DELAY_MS)?.unwrap_or(0);
        let exit_after = optional::<u64>(&lookup, ENV_EXIT_AFTER_MS)?;
        let ignore_shutdown = lookup(ENV_IGNORE_SHUTDOWN)
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let log_level =
            optional::<LevelFilter>(&lookup, ENV_LOG_LEVEL)?.unwrap_or(LevelFilter::Info);

        Ok(Self {
            port,
            supervisor_pid,
            workspace_dir: lookup(ENV_WORKSPACE_DIR).map(PathBuf::from),
            ready_delay: Duration::from_millis(ready_delay),
            ignore_shutdown,
            exit_after: exit_after.map(Duration::from_millis),
            log_level,
            supervisor_poll: DEFAULT_SUPERVISOR_POLL,
        })
    }
}

fn required<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> StubResult<T> {
    optional(lookup, key)?.ok_or_else(|| StubError::EnvVar {
        message: format!("{key} is not set"),
    })
}

fn optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> StubResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StubError::EnvVar {
                message: format!("{key} has invalid value '{raw}'"),
            }),
    }
}
