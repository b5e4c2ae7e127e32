use crate::config::{default_port_window, default_start_port};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSettings {
    /// First candidate port
    #[serde(default = "default_start_port")]
    pub start_port: u16,

    /// Number of consecutive candidates scanned from `start_port`
    #[serde(default = "default_port_window")]
    pub window: u16,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            start_port: default_start_port(),
            window: default_port_window(),
        }
    }
}
