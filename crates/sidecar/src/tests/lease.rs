use crate::SupervisorError;
use crate::lease::{LeaseFile, LeaseRecord};

use googletest::assert_that;
use googletest::prelude::{eq, none};
use tempfile::TempDir;

const DEAD_PID: u32 = 999_999;

fn write_record(dir: &TempDir, supervisor_pid: u32) -> LeaseRecord {
    let record = LeaseRecord {
        supervisor_pid,
        backend_pid: DEAD_PID,
        port: 8003,
        started_at: "2026-01-01T00:00:00Z".into(),
    };
    LeaseFile::write(dir.path(), &record).unwrap();
    record
}

#[test]
fn given_record_when_write_then_read_back() {
    let temp = TempDir::new().unwrap();
    let record = LeaseRecord::new(4321, 8001);

    LeaseFile::write(temp.path(), &record).unwrap();

    assert!(LeaseFile::path(temp.path()).exists());
    assert_that!(LeaseFile::read(temp.path()), eq(&Some(record)));
}

#[cfg(unix)]
#[test]
fn given_record_when_write_then_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    LeaseFile::write(temp.path(), &LeaseRecord::new(4321, 8001)).unwrap();

    let mode = std::fs::metadata(LeaseFile::path(temp.path()))
        .unwrap()
        .permissions()
        .mode();
    assert_that!(mode & 0o777, eq(0o600));
}

#[test]
fn given_no_file_when_read_then_none() {
    let temp = TempDir::new().unwrap();

    assert_that!(LeaseFile::read(temp.path()), none());
}

#[test]
fn given_corrupt_file_when_read_then_none() {
    let temp = TempDir::new().unwrap();
    std::fs::write(LeaseFile::path(temp.path()), "{not json").unwrap();

    assert_that!(LeaseFile::read(temp.path()), none());
}

#[test]
fn given_own_record_when_ensure_not_owned_elsewhere_then_returned() {
    let temp = TempDir::new().unwrap();
    let record = write_record(&temp, std::process::id());

    let found = LeaseFile::ensure_not_owned_elsewhere(temp.path()).unwrap();

    assert_that!(found, eq(&Some(record)));
}

#[test]
fn given_dead_supervisor_record_when_ensure_not_owned_elsewhere_then_stale_record_returned() {
    let temp = TempDir::new().unwrap();
    write_record(&temp, DEAD_PID);

    let found = LeaseFile::ensure_not_owned_elsewhere(temp.path())
        .unwrap()
        .unwrap();

    assert!(found.is_stale());
    assert_that!(found.port, eq(8003));
}

#[cfg(unix)]
#[test]
fn given_live_foreign_supervisor_record_when_ensure_not_owned_elsewhere_then_already_running() {
    let temp = TempDir::new().unwrap();
    let parent = std::os::unix::process::parent_id();
    write_record(&temp, parent);

    let result = LeaseFile::ensure_not_owned_elsewhere(temp.path());

    let Err(SupervisorError::AlreadyRunning { pid, .. }) = result else {
        panic!("expected AlreadyRunning, got {result:?}");
    };
    assert_that!(pid, eq(parent));
}

#[test]
fn given_lease_file_when_remove_then_gone_and_second_remove_harmless() {
    let temp = TempDir::new().unwrap();
    write_record(&temp, std::process::id());

    LeaseFile::remove(temp.path());
    LeaseFile::remove(temp.path());

    assert!(!LeaseFile::path(temp.path()).exists());
}
