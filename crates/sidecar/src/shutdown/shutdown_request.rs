use std::time::Duration;

/// How a stop should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    /// Ask the backend over HTTP to exit before any forced measure
    pub graceful: bool,
    /// Time the backend gets to exit before the process tree is killed
    pub timeout: Duration,
}

impl ShutdownRequest {
    pub fn graceful(timeout: Duration) -> Self {
        Self {
            graceful: true,
            timeout,
        }
    }

    /// Skip the HTTP request; kill once `timeout` passes without an exit.
    pub fn forced(timeout: Duration) -> Self {
        Self {
            graceful: false,
            timeout,
        }
    }

    pub fn immediate() -> Self {
        Self::forced(Duration::ZERO)
    }
}
