/// Whether a previously bound port is known to be free again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    /// A probe is pending or the backend vanished without a release check
    Unknown,
    /// A live backend holds the port
    Bound,
    /// Release was observed after the backend stopped
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortLease {
    pub port: u16,
    pub status: PortStatus,
}

impl PortLease {
    pub fn bound(port: u16) -> Self {
        Self {
            port,
            status: PortStatus::Bound,
        }
    }

    /// A port that must not be handed to a new backend yet.
    pub fn is_unconfirmed(&self) -> bool {
        self.status != PortStatus::Free
    }
}
