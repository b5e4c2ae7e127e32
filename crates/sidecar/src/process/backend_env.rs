use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

pub const ENV_PORT: &str = "SIDECAR_PORT";
pub const ENV_ROOT_DIR: &str = "SIDECAR_ROOT_DIR";
pub const ENV_WORKSPACE_DIR: &str = "SIDECAR_WORKSPACE_DIR";
pub const ENV_SUPERVISOR_PID: &str = "SIDECAR_SUPERVISOR_PID";
pub const ENV_STARTED_AT: &str = "SIDECAR_STARTED_AT";

/// Environment contract between the supervisor and the backend.
#[derive(Debug, Clone)]
pub struct BackendEnv {
    pub port: u16,
    pub root_dir: PathBuf,
    pub workspace_dir: PathBuf,
    /// Lets the backend notice when the supervisor is gone
    pub supervisor_pid: u32,
    pub started_at: DateTime<Utc>,
    /// Pass-through variables from configuration
    pub extra: BTreeMap<String, String>,
}

impl BackendEnv {
    pub fn new(port: u16, root_dir: PathBuf, workspace_dir: PathBuf) -> Self {
        Self {
            port,
            root_dir,
            workspace_dir,
            supervisor_pid: std::process::id(),
            started_at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, extra: BTreeMap<String, String>) -> Self {
        self.extra = extra;
        self
    }

    /// All variables as they are set on the child. Contract variables win
    /// over pass-through ones with the same name.
    pub fn vars(&self) -> Vec<(String, String)> {
        let mut vars: BTreeMap<String, String> = self.extra.clone();
        vars.insert(ENV_PORT.into(), self.port.to_string());
        vars.insert(
            ENV_ROOT_DIR.into(),
            self.root_dir.to_string_lossy().into_owned(),
        );
        vars.insert(
            ENV_WORKSPACE_DIR.into(),
            self.workspace_dir.to_string_lossy().into_owned(),
        );
        vars.insert(ENV_SUPERVISOR_PID.into(), self.supervisor_pid.to_string());
        vars.insert(ENV_STARTED_AT.into(), self.started_at.to_rfc3339());
        vars.into_iter().collect()
    }
}
