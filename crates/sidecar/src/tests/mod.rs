mod lease;
mod port;
mod trigger;


use crate::clock::Clock;
use crate::port::PortProbe;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Virtual clock: `sleep` advances time instantly and records the request.
#[derive(Debug)]
pub(crate) struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.elapsed.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }
}

/// Port probe answering from an in-memory set of busy ports.
#[derive(Debug, Default)]
pub(crate) struct FakePortProbe {
    busy: Mutex<HashSet<u16>>,
}

impl FakePortProbe {
    pub(crate) fn with_busy(ports: impl IntoIterator<Item = u16>) -> Arc<Self> {
        Arc::new(Self {
            busy: Mutex::new(ports.into_iter().collect()),
        })
    }

    pub(crate) fn free() -> Arc<Self> {
        Self::with_busy([])
    }

    pub(crate) fn release(&self, port: u16) {
        self.busy.lock().unwrap().remove(&port);
    }
}

impl PortProbe for FakePortProbe {
    fn is_port_in_use(&self, port: u16) -> bool {
        self.busy.lock().unwrap().contains(&port)
    }
}

/// A port nothing listens on right now.
pub(crate) fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

#[cfg(unix)]
pub(crate) fn shell_spec(script: &str, dir: &std::path::Path) -> crate::process::LaunchSpec {
    use crate::process::{BackendEnv, LaunchSpec};

    LaunchSpec {
        executable: "/bin/sh".into(),
        args: vec!["-c".into(), script.into()],
        working_dir: dir.to_path_buf(),
        env: BackendEnv::new(unused_port(), dir.to_path_buf(), dir.join("workspace")),
    }
}
