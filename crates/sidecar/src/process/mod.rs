mod backend_env;
mod backend_process;
mod handle;
mod launcher;
mod tree;

pub use backend_env::{
    BackendEnv, ENV_PORT, ENV_ROOT_DIR, ENV_STARTED_AT, ENV_SUPERVISOR_PID, ENV_WORKSPACE_DIR,
};
pub use backend_process::{BackendProcess, BackendState};
pub use handle::{BackendExit, ProcessHandle};
pub use launcher::{LaunchSpec, ProcessLauncher};
pub use tree::{is_process_running, kill_process_tree};

#[cfg(unix)]
pub use tree::descendants;

#[cfg(all(test, target_os = "linux"))]
pub(crate) use tree::parse_parent_pid;
