use serde::Serialize;

/// Notification published to the host (and through it, the UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Emitted once per successful startup
    Ready { port: u16 },
    /// Startup failed; the host shows `error` with `recovery_hint`
    NotReady {
        error: String,
        recovery_hint: String,
    },
    /// The backend exited while no shutdown was running
    BackendExited { pid: u32, code: Option<i32> },
    Stopped { forced: bool, port_released: bool },
}
