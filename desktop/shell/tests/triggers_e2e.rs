//! End-to-end tests for the host's panic and signal paths.
//!
//! The backend is a shell `sleep` that never answers health checks, so
//! every trigger lands during startup and has to cut the health wait short.
#![cfg(unix)]

use sidecar::config::SupervisorConfig;
use sidecar::lease::LeaseFile;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use googletest::assert_that;
use googletest::prelude::{eq, len};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serde_json::Value;
use serial_test::serial;
use tempfile::TempDir;

const SHELL: &str = env!("CARGO_BIN_EXE_sidecar-shell");

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

/// Spawn the host over a data dir whose backend never becomes healthy.
fn spawn_shell(data_dir: &Path) -> Child {
    let mut config = SupervisorConfig::default();
    config.backend.executable = PathBuf::from("/bin/sh");
    config.backend.args = vec!["-c".into(), "exec sleep 60".into()];
    config.ports.start_port = free_port();
    config.save(data_dir).unwrap();

    Command::new(SHELL)
        .arg("--data-dir")
        .arg(data_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

/// Backend PID from the lease file, once the backend has been spawned.
fn wait_for_backend_pid(data_dir: &Path) -> u32 {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(record) = LeaseFile::read(data_dir) {
            return record.backend_pid;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    panic!("backend was never spawned");
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("sidecar-shell did not exit within {timeout:?}");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn stdout_lines(child: &mut Child) -> Vec<Value> {
    let mut out = String::new();
    child
        .stdout
        .take()
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
    out.lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

fn exit_report(lines: &[Value]) -> &Value {
    lines
        .iter()
        .find(|line| line.get("exit_code").is_some())
        .unwrap_or_else(|| panic!("no exit report in {lines:?}"))
}

/// False once the process is gone or a zombie left for init to reap.
fn is_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .is_some_and(|(_, rest)| !rest.trim_start().starts_with('Z')),
        Err(_) if Path::new("/proc/self/stat").exists() => false,
        Err(_) => sidecar::process::is_process_running(pid),
    }
}

fn assert_gone_within(pid: u32, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while is_alive(pid) {
        assert!(
            Instant::now() < deadline,
            "backend PID {pid} still alive after {timeout:?}"
        );
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
#[serial]
fn given_panic_command_when_backend_starting_then_backend_killed_and_exit_code_one() {
    let temp = TempDir::new().unwrap();
    let mut shell = spawn_shell(temp.path());
    let backend_pid = wait_for_backend_pid(temp.path());

    let mut stdin = shell.stdin.take().unwrap();
    stdin.write_all(b"panic\n").unwrap();
    stdin.flush().unwrap();

    let status = wait_with_timeout(&mut shell, Duration::from_secs(10));

    assert_that!(status.code(), eq(Some(1)));
    let lines = stdout_lines(&mut shell);
    let report = exit_report(&lines);
    assert_that!(report["trigger"].as_str(), eq(Some("unhandled panic")));
    assert_that!(report["outcome"].as_str(), eq(Some("completed")));
    assert_that!(report["forced"].as_bool(), eq(Some(true)));
    assert_gone_within(backend_pid, Duration::from_secs(3));
}

#[test]
#[serial]
fn given_sigterm_when_backend_starting_then_single_stop_and_exit_code_zero() {
    let temp = TempDir::new().unwrap();
    let mut shell = spawn_shell(temp.path());
    let backend_pid = wait_for_backend_pid(temp.path());

    let started = Instant::now();
    kill(Pid::from_raw(shell.id() as i32), Signal::SIGTERM).unwrap();
    let status = wait_with_timeout(&mut shell, Duration::from_secs(10));

    assert_that!(status.code(), eq(Some(0)));
    // Grace timeout plus kill and release waits, not the 60 s health budget
    assert!(started.elapsed() < Duration::from_secs(8));

    let lines = stdout_lines(&mut shell);
    let stopped: Vec<&Value> = lines
        .iter()
        .filter(|line| line["event"].as_str() == Some("stopped"))
        .collect();
    assert_that!(stopped, len(eq(1)));
    let report = exit_report(&lines);
    assert_that!(report["trigger"].as_str(), eq(Some("signal 15")));
    assert_that!(report["exit_code"].as_i64(), eq(Some(0)));
    assert_gone_within(backend_pid, Duration::from_secs(3));
}

#[test]
#[serial]
fn given_stdin_closed_when_backend_starting_then_quits_cleanly() {
    let temp = TempDir::new().unwrap();
    let mut shell = spawn_shell(temp.path());
    let backend_pid = wait_for_backend_pid(temp.path());

    drop(shell.stdin.take());
    let status = wait_with_timeout(&mut shell, Duration::from_secs(10));

    assert_that!(status.code(), eq(Some(0)));
    let lines = stdout_lines(&mut shell);
    assert_that!(exit_report(&lines)["trigger"].as_str(), eq(Some("app quit")));
    assert_gone_within(backend_pid, Duration::from_secs(3));
}
