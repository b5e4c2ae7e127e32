use serde::Serialize;
use tokio::sync::watch;

/// How the backend process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendExit {
    /// Exit code, `None` when terminated by a signal or unknown
    pub code: Option<i32>,
    pub success: bool,
}

impl BackendExit {
    pub(crate) const UNKNOWN: Self = Self {
        code: None,
        success: false,
    };
}

/// Handle on a spawned backend.
///
/// The child itself is owned by an exit watcher task; the handle only
/// carries the pid and a view of the exit status, so it is cheap to clone.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    exit_rx: watch::Receiver<Option<BackendExit>>,
}

impl ProcessHandle {
    pub(crate) fn new(pid: u32, exit_rx: watch::Receiver<Option<BackendExit>>) -> Self {
        Self { pid, exit_rx }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the OS already reported it.
    pub fn exit_status(&self) -> Option<BackendExit> {
        *self.exit_rx.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Wait until the OS reports the process exit.
    pub async fn wait_exit(&self) -> BackendExit {
        let mut rx = self.exit_rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).unwrap_or(BackendExit::UNKNOWN),
            // Watcher gone without reporting: nothing left to wait for
            Err(_) => BackendExit::UNKNOWN,
        }
    }
}
