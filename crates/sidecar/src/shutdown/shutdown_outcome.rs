use serde::Serialize;

/// What a call to the shutdown entry point did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// Another shutdown holds the gate; this call did nothing
    AlreadyInProgress,
    /// No backend was tracked
    NotRunning,
    Completed {
        /// The process tree had to be killed
        forced: bool,
        /// The port was observed free before returning
        port_released: bool,
    },
}

impl ShutdownOutcome {
    pub fn did_work(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
