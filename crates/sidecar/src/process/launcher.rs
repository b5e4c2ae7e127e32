//! Backend process spawning with output capture and exit tracking.

use crate::process::{BackendEnv, BackendExit, ProcessHandle};
use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use error_location::ErrorLocation;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{error, info, warn};

const BACKEND_LOG_TARGET: &str = "sidecar::backend";

/// Everything needed to launch the backend once.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: BackendEnv,
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Spawn the backend described by `spec`.
    ///
    /// The child stays in the supervisor's process group so termination of
    /// the supervisor reaches it. stdout/stderr are forwarded to the
    /// supervisor log and an exit watcher publishes the exit status.
    pub async fn spawn(&self, spec: &LaunchSpec) -> SupervisorResult<ProcessHandle> {
        if !spec.executable.exists() {
            let listing = directory_listing(&spec.executable);
            error!(
                "Backend executable missing at {} (directory contents: {listing})",
                spec.executable.display()
            );
            return Err(SupervisorError::ExecutableNotFound {
                path: spec.executable.clone(),
                listing,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(
            "Spawning backend {} in {} on port {}",
            spec.executable.display(),
            spec.working_dir.display(),
            spec.env.port
        );

        let mut cmd = Command::new(&spec.executable);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(spec.env.vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        let mut child = cmd.spawn().map_err(|e| SupervisorError::SpawnFailed {
            message: format!("{}: {e}", spec.executable.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let Some(pid) = child.id() else {
            return Err(SupervisorError::SpawnFailed {
                message: "OS returned no process id".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        info!("Spawned backend with PID: {pid}");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, pid, OutputStream::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, pid, OutputStream::Stderr));
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => exit_from_status(status),
                Err(e) => {
                    warn!("Failed to wait on backend PID {pid}: {e}");
                    BackendExit::UNKNOWN
                }
            };
            info!("Backend PID {pid} exited: {exit:?}");
            exit_tx.send_replace(Some(exit));
        });

        Ok(ProcessHandle::new(pid, exit_rx))
    }
}

fn exit_from_status(status: ExitStatus) -> BackendExit {
    BackendExit {
        code: status.code(),
        success: status.success(),
    }
}

async fn forward_output<R>(reader: R, pid: u32, stream: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match stream {
                OutputStream::Stdout => info!(target: BACKEND_LOG_TARGET, pid, "{line}"),
                OutputStream::Stderr => warn!(target: BACKEND_LOG_TARGET, pid, "{line}"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Backend {stream:?} stream of PID {pid} failed: {e}");
                break;
            }
        }
    }
}

/// Names in the directory that should have held `path`, for diagnostics.
fn directory_listing(path: &Path) -> String {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return "<no parent directory>".into();
    };

    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            if names.is_empty() {
                "<empty>".into()
            } else {
                names.join(", ")
            }
        }
        Err(e) => format!("<unreadable {}: {e}>", dir.display()),
    }
}
