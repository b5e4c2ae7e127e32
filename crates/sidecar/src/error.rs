use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to create data directory at {path}: {source} {location}")]
    DataDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {message} {location}")]
    ConfigInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("No available port in range {start}-{end} {location}")]
    NoPortAvailable {
        start: u16,
        end: u16,
        location: ErrorLocation,
    },

    #[error("Backend executable not found at {path} (directory contents: {listing}) {location}")]
    ExecutableNotFound {
        path: PathBuf,
        listing: String,
        location: ErrorLocation,
    },

    #[error("Failed to spawn backend process: {message} {location}")]
    SpawnFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error(
        "Backend on port {port} not healthy after {attempts} attempts ({waited_ms}ms) {location}"
    )]
    HealthCheckTimeout {
        port: u16,
        attempts: u32,
        waited_ms: u64,
        location: ErrorLocation,
    },

    #[error("Backend exited during startup with exit code {code:?} {location}")]
    BackendExitedDuringStartup {
        code: Option<i32>,
        location: ErrorLocation,
    },

    #[error("Backend (PID {pid}) did not exit within {timeout_ms}ms {location}")]
    ShutdownTimeout {
        pid: u32,
        timeout_ms: u64,
        location: ErrorLocation,
    },

    #[error("Port {port} was not released within {waited_ms}ms {location}")]
    PortReleaseTimeout {
        port: u16,
        waited_ms: u64,
        location: ErrorLocation,
    },

    #[error("Another supervisor (PID {pid}) owns the backend (lease file: {path}) {location}")]
    AlreadyRunning {
        path: PathBuf,
        pid: u32,
        location: ErrorLocation,
    },

    #[error("Backend already running (PID {pid}, port {port}) {location}")]
    BackendAlreadyRunning {
        pid: u32,
        port: u16,
        location: ErrorLocation,
    },

    #[error("Supervisor is shutting down {location}")]
    ShuttingDown { location: ErrorLocation },

    #[error("Failed to access lease file at {path}: {source} {location}")]
    LeaseFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Failed to terminate process tree of PID {pid}: {message} {location}")]
    ProcessKill {
        pid: u32,
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    /// Whether this error ends a startup attempt and must be shown to the user.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::NoPortAvailable { .. }
                | Self::ExecutableNotFound { .. }
                | Self::SpawnFailed { .. }
                | Self::HealthCheckTimeout { .. }
                | Self::BackendExitedDuringStartup { .. }
                | Self::AlreadyRunning { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::NoPortAvailable { .. } => {
                "No free port found for the backend. \
                   Close applications using these ports or restart your computer."
            }
            Self::ExecutableNotFound { .. } => {
                "The backend executable is missing. \
                   The installation appears incomplete, please reinstall."
            }
            Self::SpawnFailed { .. } => {
                "The backend could not be launched. \
                   Check file permissions and the logs for details."
            }
            Self::HealthCheckTimeout { .. } => {
                "The backend is taking too long to start. \
                   Try restarting the application or check the logs."
            }
            Self::BackendExitedDuringStartup { .. } => {
                "The backend stopped while starting. \
                   Please report this issue with the diagnostic logs."
            }
            Self::AlreadyRunning { .. } => {
                "The application is already running. \
                   Check your task manager for another instance."
            }
            Self::ConfigInvalid { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            Self::DataDirCreation { .. } => {
                "Unable to create application data directory. \
                   Check file permissions or available disk space."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
