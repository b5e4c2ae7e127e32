use serde::Serialize;

/// Current state of the supervised backend, as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SupervisorStatus {
    /// No backend running
    Stopped,
    /// Backend spawned, waiting for health
    Starting,
    /// Backend running and healthy
    Running { port: u16 },
    /// Shutdown sequence in progress
    ShuttingDown,
    /// Startup failed or the backend died; no automatic restart
    Failed { error: String },
}

impl SupervisorStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}
