//! Point-in-time "is this port taken" checks.

use std::collections::HashSet;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

pub(crate) const HOST: &str = "127.0.0.1";

/// Kernel socket state code for LISTEN in `/proc/net/tcp*`.
const TCP_LISTEN_STATE: &str = "0A";

/// Capability to decide whether a local TCP port is in use.
pub trait PortProbe: Debug + Send + Sync {
    fn is_port_in_use(&self, port: u16) -> bool;
}

pub type SharedPortProbe = Arc<dyn PortProbe>;

/// Generic probe: the port is in use when binding 127.0.0.1:port fails.
///
/// The listener is dropped immediately, releasing the socket.
#[derive(Debug, Default, Clone, Copy)]
pub struct BindProbe;

impl PortProbe for BindProbe {
    fn is_port_in_use(&self, port: u16) -> bool {
        std::net::TcpListener::bind((HOST, port)).is_err()
    }
}

/// Precise probe reading the kernel socket tables.
///
/// Only sockets in the LISTEN state count as "in use", so connections
/// lingering in TIME_WAIT or other transitional states after a backend
/// exits do not block the port.
#[derive(Debug, Clone)]
pub struct ListenTableProbe {
    tables: Vec<PathBuf>,
}

impl ListenTableProbe {
    pub fn new(tables: Vec<PathBuf>) -> Self {
        Self { tables }
    }

    /// Probe over `/proc/net/tcp` and `/proc/net/tcp6`.
    pub fn system() -> Self {
        Self::new(vec![
            PathBuf::from("/proc/net/tcp"),
            PathBuf::from("/proc/net/tcp6"),
        ])
    }

    /// Whether at least one socket table can be read.
    pub fn is_supported(&self) -> bool {
        self.tables
            .iter()
            .any(|table| std::fs::read_to_string(table).is_ok())
    }

    fn listening_ports(&self) -> HashSet<u16> {
        let mut ports = HashSet::new();
        for table in &self.tables {
            match std::fs::read_to_string(table) {
                Ok(contents) => ports.extend(parse_listening_ports(&contents)),
                Err(e) => debug!("Socket table {} unreadable: {e}", table.display()),
            }
        }
        ports
    }
}

impl PortProbe for ListenTableProbe {
    fn is_port_in_use(&self, port: u16) -> bool {
        self.listening_ports().contains(&port)
    }
}

/// Extract the local ports of all LISTEN sockets from a `/proc/net/tcp`
/// style table.
///
/// Rows look like `0: 0100007F:1F40 00000000:0000 0A ...`, the local port
/// being the hex value after the colon in the second column.
pub fn parse_listening_ports(contents: &str) -> HashSet<u16> {
    contents
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let local = fields.nth(1)?;
            let state = fields.nth(1)?;
            if state != TCP_LISTEN_STATE {
                return None;
            }
            let (_, port_hex) = local.rsplit_once(':')?;
            u16::from_str_radix(port_hex, 16).ok()
        })
        .collect()
}

/// Pick the most precise probe the platform supports.
pub fn default_probe() -> SharedPortProbe {
    if cfg!(target_os = "linux") {
        let probe = ListenTableProbe::system();
        if probe.is_supported() {
            return Arc::new(probe);
        }
    }
    Arc::new(BindProbe)
}
