use crate::process::ProcessHandle;

use chrono::{DateTime, Utc};

/// Lifecycle of the supervised backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Spawned, health not yet confirmed
    Starting,
    /// Health endpoint answered 200
    Ready,
    /// Shutdown sequence running
    Stopping,
    /// Exited on its own
    Gone,
}

/// The single supervised backend process.
#[derive(Debug, Clone)]
pub struct BackendProcess {
    pub handle: ProcessHandle,
    pub port: u16,
    pub state: BackendState,
    pub started_at: DateTime<Utc>,
}

impl BackendProcess {
    pub fn new(handle: ProcessHandle, port: u16) -> Self {
        Self {
            handle,
            port,
            state: BackendState::Starting,
            started_at: Utc::now(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.handle.pid()
    }
}
