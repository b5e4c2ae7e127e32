use crate::config::{default_executable, default_workspace_dir};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Backend executable. Relative names are searched next to the shell
    /// executable, then under `<data_dir>/bin`.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Extra command line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory (defaults to the data directory)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Default data workspace handed to the backend (relative to data directory)
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Additional environment variables passed through to the backend
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            args: Vec::new(),
            working_dir: None,
            workspace_dir: default_workspace_dir(),
            env: BTreeMap::new(),
        }
    }
}

impl BackendSettings {
    /// Resolve the backend executable path.
    ///
    /// Search order:
    /// 1. Absolute path as configured
    /// 2. Sibling to current exe (bundled layout)
    /// 3. `<data_dir>/bin/<name>`
    ///
    /// When nothing exists the sibling candidate is returned so the
    /// launcher reports where the executable was expected.
    pub fn resolve_executable(&self, data_dir: &Path) -> PathBuf {
        if self.executable.is_absolute() {
            return self.executable.clone();
        }

        let sibling = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&self.executable)));

        if let Some(ref sibling) = sibling
            && sibling.exists()
        {
            info!("Using backend (sibling): {}", sibling.display());
            return sibling.clone();
        }

        let installed = data_dir.join("bin").join(&self.executable);
        if installed.exists() {
            info!("Using backend (installed): {}", installed.display());
            return installed;
        }

        sibling.unwrap_or(installed)
    }

    pub fn resolve_working_dir(&self, data_dir: &Path) -> PathBuf {
        match self.working_dir {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => data_dir.join(dir),
            None => data_dir.to_path_buf(),
        }
    }

    pub fn resolve_workspace_dir(&self, data_dir: &Path) -> PathBuf {
        if self.workspace_dir.is_absolute() {
            self.workspace_dir.clone()
        } else {
            data_dir.join(&self.workspace_dir)
        }
    }
}
