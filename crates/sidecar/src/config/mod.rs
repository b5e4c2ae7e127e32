//! Supervisor configuration with validation and versioning.

mod backend_settings;
mod health_settings;
mod logging_settings;
mod port_settings;
mod shutdown_settings;

pub use backend_settings::BackendSettings;
pub use health_settings::HealthSettings;
pub use logging_settings::LoggingSettings;
pub use port_settings::PortSettings;
pub use shutdown_settings::ShutdownSettings;

use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

pub const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_EXECUTABLE: &str = "backend";
const DEFAULT_WORKSPACE_DIR: &str = "workspace";
const DEFAULT_START_PORT: u16 = 8000;
const DEFAULT_PORT_WINDOW: u16 = 10;
const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 1500;
const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 4000;
const DEFAULT_MAX_WAIT_MS: u64 = 60_000;
const DEFAULT_GRACE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_SHUTDOWN_REQUEST_TIMEOUT_MS: u64 = 1000;
const DEFAULT_RELEASE_POLL_INTERVAL_MS: u64 = 150;
const DEFAULT_RELEASE_WAIT_MS: u64 = 8000;
const DEFAULT_KILL_EXIT_WAIT_MS: u64 = 2000;
const DEFAULT_PANIC_TIMEOUT_MS: u64 = 1500;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_RETENTION: usize = 7;

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub ports: PortSettings,

    #[serde(default)]
    pub health: HealthSettings,

    #[serde(default)]
    pub shutdown: ShutdownSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
pub(crate) fn default_executable() -> PathBuf {
    PathBuf::from(DEFAULT_EXECUTABLE)
}
pub(crate) fn default_workspace_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORKSPACE_DIR)
}
pub(crate) fn default_start_port() -> u16 {
    DEFAULT_START_PORT
}
pub(crate) fn default_port_window() -> u16 {
    DEFAULT_PORT_WINDOW
}
pub(crate) fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}
pub(crate) fn default_initial_retry_delay() -> u64 {
    DEFAULT_INITIAL_RETRY_DELAY_MS
}
pub(crate) fn default_max_retry_delay() -> u64 {
    DEFAULT_MAX_RETRY_DELAY_MS
}
pub(crate) fn default_max_wait() -> u64 {
    DEFAULT_MAX_WAIT_MS
}
pub(crate) fn default_grace_timeout() -> u64 {
    DEFAULT_GRACE_TIMEOUT_MS
}
pub(crate) fn default_shutdown_request_timeout() -> u64 {
    DEFAULT_SHUTDOWN_REQUEST_TIMEOUT_MS
}
pub(crate) fn default_release_poll_interval() -> u64 {
    DEFAULT_RELEASE_POLL_INTERVAL_MS
}
pub(crate) fn default_release_wait() -> u64 {
    DEFAULT_RELEASE_WAIT_MS
}
pub(crate) fn default_kill_exit_wait() -> u64 {
    DEFAULT_KILL_EXIT_WAIT_MS
}
pub(crate) fn default_panic_timeout() -> u64 {
    DEFAULT_PANIC_TIMEOUT_MS
}
pub(crate) fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
pub(crate) fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}
pub(crate) fn default_log_retention() -> usize {
    DEFAULT_LOG_RETENTION
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: BackendSettings::default(),
            ports: PortSettings::default(),
            health: HealthSettings::default(),
            shutdown: ShutdownSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// === Configuration Operations ===

impl SupervisorConfig {
    /// Load config from file, creating default if not exists.
    pub fn load_or_create(data_dir: &Path) -> SupervisorResult<Self> {
        let config_path = data_dir.join(CONFIG_FILENAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self =
                toml::from_str(&content).map_err(|e| SupervisorError::ConfigInvalid {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(data_dir)?;
            }

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(data_dir)?;
            Ok(config)
        }
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern to prevent
    /// partial writes if the process is interrupted.
    pub fn save(&self, data_dir: &Path) -> SupervisorResult<()> {
        let config_path = data_dir.join(CONFIG_FILENAME);
        let content = toml::to_string_pretty(self).map_err(|e| SupervisorError::ConfigInvalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> SupervisorResult<Self> {
        // Version 0 -> 1: shutdown budgets became configurable
        if config.version == 0 {
            config.shutdown = ShutdownSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> SupervisorResult<()> {
        if self.ports.start_port < MIN_PORT {
            return Err(invalid(format!(
                "ports.start_port must be >= {MIN_PORT} (unprivileged)"
            )));
        }

        if self.ports.window == 0 {
            return Err(invalid("ports.window must be > 0".into()));
        }

        if self.health.attempt_timeout_ms == 0 || self.health.max_wait_ms == 0 {
            return Err(invalid(
                "health.attempt_timeout_ms and health.max_wait_ms must be > 0".into(),
            ));
        }

        if self.health.initial_retry_delay_ms == 0 {
            return Err(invalid("health.initial_retry_delay_ms must be > 0".into()));
        }

        if self.health.initial_retry_delay_ms > self.health.max_retry_delay_ms {
            return Err(invalid(
                "health.initial_retry_delay_ms must not exceed health.max_retry_delay_ms".into(),
            ));
        }

        if self.shutdown.release_poll_interval_ms == 0 {
            return Err(invalid("shutdown.release_poll_interval_ms must be > 0".into()));
        }

        if self.backend.executable.as_os_str().is_empty() {
            return Err(invalid("backend.executable must not be empty".into()));
        }

        Ok(())
    }
}

#[track_caller]
fn invalid(message: String) -> SupervisorError {
    SupervisorError::ConfigInvalid {
        message,
        location: ErrorLocation::from(Location::caller()),
    }
}
