use crate::config::{default_log_dir, default_log_level, default_log_retention};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative to data directory)
    #[serde(default = "default_log_dir")]
    pub directory: String,

    /// Number of daily log files to keep
    #[serde(default = "default_log_retention")]
    pub retention_count: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
            retention_count: default_log_retention(),
        }
    }
}
