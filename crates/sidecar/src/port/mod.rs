mod allocator;
mod port_lease;
mod probe;

pub use allocator::PortAllocator;
pub use port_lease::{PortLease, PortStatus};
pub use probe::{
    BindProbe, ListenTableProbe, PortProbe, SharedPortProbe, default_probe, parse_listening_ports,
};

pub(crate) use probe::HOST;
