use std::fmt;

/// Progress of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Idle,
    Stopping,
    GracefulRequested,
    WaitingForExit,
    ForceKilling,
    WaitingForPortRelease,
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Stopping => "stopping",
            Self::GracefulRequested => "graceful_requested",
            Self::WaitingForExit => "waiting_for_exit",
            Self::ForceKilling => "force_killing",
            Self::WaitingForPortRelease => "waiting_for_port_release",
        };
        f.write_str(name)
    }
}
