//! OS-level process liveness and process-tree termination.

use crate::SupervisorResult;

#[cfg(unix)]
use crate::SupervisorError;
#[cfg(unix)]
use error_location::ErrorLocation;
#[cfg(unix)]
use std::panic::Location;
use tracing::{debug, info};

/// Check if a process with the given PID is running.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    // SAFETY: kill with signal 0 only checks existence, no signal is sent.
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

/// Check if a process with the given PID is running (Windows).
#[cfg(windows)]
pub fn is_process_running(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    // SAFETY: OpenProcess returns null on failure; the handle is closed
    // before returning.
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            return false;
        }

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle);

        result != 0 && exit_code == STILL_ACTIVE as u32
    }
}

/// Direct children of `pid`, read from `/proc/<n>/stat`.
#[cfg(target_os = "linux")]
fn child_pids(pid: u32) -> Vec<u32> {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|candidate| {
            std::fs::read_to_string(format!("/proc/{candidate}/stat"))
                .ok()
                .and_then(|stat| parse_parent_pid(&stat))
                == Some(pid)
        })
        .collect()
}

/// Parent pid from a `/proc/<pid>/stat` line. The command name is wrapped
/// in parentheses and may itself contain spaces or parentheses, so fields
/// are counted from the last `)`.
#[cfg(target_os = "linux")]
pub(crate) fn parse_parent_pid(stat: &str) -> Option<u32> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn child_pids(pid: u32) -> Vec<u32> {
    match std::process::Command::new("pgrep")
        .args(["-P", &pid.to_string()])
        .output()
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect(),
        Err(e) => {
            debug!("pgrep failed for PID {pid}: {e}");
            Vec::new()
        }
    }
}

/// All descendants of `pid`, parents before children.
#[cfg(unix)]
pub fn descendants(pid: u32) -> Vec<u32> {
    let mut found = Vec::new();
    let mut frontier = vec![pid];
    while let Some(parent) = frontier.pop() {
        for child in child_pids(parent) {
            if child != pid && !found.contains(&child) {
                found.push(child);
                frontier.push(child);
            }
        }
    }
    found
}

/// SIGKILL `pid` and every process it spawned.
///
/// The tree is collected before anything is killed: once the root dies its
/// children are reparented and can no longer be found through it.
#[cfg(unix)]
pub async fn kill_process_tree(pid: u32) -> SupervisorResult<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let tree = descendants(pid);
    info!("Force killing backend PID {pid} and {} descendants", tree.len());

    match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            return Err(SupervisorError::ProcessKill {
                pid,
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    for child in tree {
        if let Err(e) = kill(Pid::from_raw(child as i32), Signal::SIGKILL) {
            debug!("Descendant PID {child} not killed: {e}");
        }
    }

    Ok(())
}

#[cfg(windows)]
pub async fn kill_process_tree(pid: u32) -> SupervisorResult<()> {
    use crate::SupervisorError;
    use error_location::ErrorLocation;
    use std::panic::Location;

    info!("Force killing backend PID {pid} with taskkill /T");

    let output = tokio::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output()
        .await?;

    if !output.status.success() && is_process_running(pid) {
        return Err(SupervisorError::ProcessKill {
            pid,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!("taskkill finished for PID {pid}");
    Ok(())
}
