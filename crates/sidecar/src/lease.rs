//! On-disk record of the running backend, surviving supervisor crashes.
//!
//! The file holds the supervisor PID, backend PID and port. On the next
//! launch a stale record tells the supervisor which port may still be held
//! by an orphaned backend. The recorded backend PID is informational only:
//! after a crash it may already belong to an unrelated process.

use crate::process::is_process_running;
use crate::{SupervisorError, SupervisorResult};

use std::fs::OpenOptions;
use std::io::Write;
use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const LEASE_FILENAME: &str = "backend.lease";
#[cfg(unix)]
const LEASE_FILE_MODE: u32 = 0o600; // Owner read/write only

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub supervisor_pid: u32,
    pub backend_pid: u32,
    pub port: u16,
    pub started_at: String,
}

impl LeaseRecord {
    pub fn new(backend_pid: u32, port: u16) -> Self {
        Self {
            supervisor_pid: std::process::id(),
            backend_pid,
            port,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Written by a supervisor that is no longer alive.
    pub fn is_stale(&self) -> bool {
        self.supervisor_pid != std::process::id() && !is_process_running(self.supervisor_pid)
    }
}

pub struct LeaseFile;

impl LeaseFile {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(LEASE_FILENAME)
    }

    /// Write the record atomically via temp file and rename.
    pub fn write(data_dir: &Path, record: &LeaseRecord) -> SupervisorResult<()> {
        let path = Self::path(data_dir);
        let temp_path = path.with_extension("lease.tmp");
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| lease_error(&path, std::io::Error::other(e)))?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(LEASE_FILE_MODE);

        let mut file = options
            .open(&temp_path)
            .map_err(|e| lease_error(&temp_path, e))?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| lease_error(&temp_path, e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| lease_error(&path, e))?;

        Ok(())
    }

    /// Read the record, `None` when absent or unreadable.
    pub fn read(data_dir: &Path) -> Option<LeaseRecord> {
        let content = std::fs::read_to_string(Self::path(data_dir)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Fail when a live supervisor other than this one owns the lease.
    pub fn ensure_not_owned_elsewhere(data_dir: &Path) -> SupervisorResult<Option<LeaseRecord>> {
        let Some(record) = Self::read(data_dir) else {
            return Ok(None);
        };

        if record.supervisor_pid != std::process::id() && !record.is_stale() {
            return Err(SupervisorError::AlreadyRunning {
                path: Self::path(data_dir),
                pid: record.supervisor_pid,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Some(record))
    }

    pub fn remove(data_dir: &Path) {
        let path = Self::path(data_dir);
        if path.exists() {
            info!("Removing lease file {}", path.display());
            std::fs::remove_file(&path).ok();
        }
    }
}

#[track_caller]
fn lease_error(path: &Path, source: std::io::Error) -> SupervisorError {
    SupervisorError::LeaseFile {
        path: path.to_path_buf(),
        source,
        location: ErrorLocation::from(Location::caller()),
    }
}
