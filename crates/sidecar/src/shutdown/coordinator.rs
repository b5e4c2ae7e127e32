//! Idempotent, multi-phase backend shutdown.

use crate::clock::SharedClock;
use crate::config::ShutdownSettings;
use crate::lease::LeaseFile;
use crate::port::{HOST, PortAllocator, PortLease, PortStatus};
use crate::process::{BackendState, ProcessHandle, kill_process_tree};
use crate::shutdown::{ShutdownOutcome, ShutdownPhase, ShutdownRequest};
use crate::state::SharedState;
use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use error_location::ErrorLocation;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

pub const SHUTDOWN_PATH: &str = "/__internal__/shutdown";

/// Drives `Idle → Stopping → GracefulRequested → WaitingForExit →
/// ForceKilling → WaitingForPortRelease → Idle`.
///
/// Every trigger (window close, quit, signal, panic) ends up in
/// [`stop`](Self::stop); the gate makes all but the first concurrent call
/// a no-op.
pub struct ShutdownCoordinator {
    state: SharedState,
    allocator: Arc<PortAllocator>,
    clock: SharedClock,
    client: reqwest::Client,
    settings: ShutdownSettings,
    /// Held by startup for its whole attempt chain
    transition: Arc<Mutex<()>>,
    lease_dir: Option<PathBuf>,
    in_progress: AtomicBool,
    phase_tx: watch::Sender<ShutdownPhase>,
}

/// Clears tracked state and reopens the gate on every exit path,
/// including unwinding and cancellation of the stop future.
struct StopGuard<'a> {
    coordinator: &'a ShutdownCoordinator,
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        let coordinator = self.coordinator;
        coordinator.state.lock().backend = None;
        // Gate first: watchers woken by the Idle phase must see it open
        coordinator.in_progress.store(false, Ordering::Release);
        coordinator.phase_tx.send_replace(ShutdownPhase::Idle);
        debug!("Shutdown gate released");
    }
}

impl ShutdownCoordinator {
    pub fn new(
        state: SharedState,
        allocator: Arc<PortAllocator>,
        clock: SharedClock,
        settings: ShutdownSettings,
        transition: Arc<Mutex<()>>,
        lease_dir: Option<PathBuf>,
    ) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder().no_proxy().build()?;
        let (phase_tx, _) = watch::channel(ShutdownPhase::Idle);

        Ok(Self {
            state,
            allocator,
            clock,
            client,
            settings,
            transition,
            lease_dir,
            in_progress: AtomicBool::new(false),
            phase_tx,
        })
    }

    pub fn is_stopping(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase_tx.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase_tx.subscribe()
    }

    /// Wait until no shutdown is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.phase_tx.subscribe();
        while self.is_stopping() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Stop the tracked backend.
    ///
    /// Sub-step failures (HTTP request, exit wait, kill) are logged and the
    /// sequence moves on; the call never fails. Total duration is bounded
    /// by `request.timeout + kill_exit_wait + release_wait`.
    pub async fn stop(&self, request: ShutdownRequest) -> ShutdownOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Shutdown already in progress, ignoring {request:?}");
            return ShutdownOutcome::AlreadyInProgress;
        }
        let _guard = StopGuard { coordinator: self };
        self.set_phase(ShutdownPhase::Stopping);

        // A startup attempt in flight finishes first
        let _transition = self.transition.lock().await;

        let backend = {
            let mut state = self.state.lock();
            state.backend.as_mut().map(|backend| {
                backend.state = BackendState::Stopping;
                backend.clone()
            })
        };
        let Some(backend) = backend else {
            info!("No backend process tracked, nothing to stop");
            return ShutdownOutcome::NotRunning;
        };

        let pid = backend.pid();
        let port = backend.port;
        let exit_deadline = self.clock.now() + request.timeout;
        info!(
            "Stopping backend PID {pid} on port {port} (graceful: {}, timeout: {:?})",
            request.graceful, request.timeout
        );

        if request.graceful && !backend.handle.has_exited() {
            self.set_phase(ShutdownPhase::GracefulRequested);
            self.request_graceful_shutdown(port, request.timeout).await;
        }

        self.set_phase(ShutdownPhase::WaitingForExit);
        let remaining = exit_deadline.saturating_duration_since(self.clock.now());
        let forced = if self.wait_for_exit(&backend.handle, remaining).await {
            false
        } else {
            self.force_terminate(&backend.handle, request.timeout).await;
            true
        };

        self.set_phase(ShutdownPhase::WaitingForPortRelease);
        let port_released = self.await_port_release(port).await;

        info!("Backend stopped (forced: {forced}, port released: {port_released})");
        ShutdownOutcome::Completed {
            forced,
            port_released,
        }
    }

    fn set_phase(&self, phase: ShutdownPhase) {
        debug!("Shutdown phase: {phase}");
        self.phase_tx.send_replace(phase);
    }

    /// Ask the backend to exit. Failures only make the forced path likelier.
    async fn request_graceful_shutdown(&self, port: u16, budget: Duration) {
        let url = format!("http://{HOST}:{port}{SHUTDOWN_PATH}");
        let timeout = self.settings.request_timeout().min(budget);

        match self.client.post(&url).timeout(timeout).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Graceful shutdown request acknowledged");
            }
            Ok(resp) => {
                warn!("Shutdown request returned HTTP {}", resp.status());
            }
            Err(e) => {
                warn!("Failed to send shutdown request: {e}");
            }
        }
    }

    /// Race the OS exit notification against `timeout`.
    async fn wait_for_exit(&self, handle: &ProcessHandle, timeout: Duration) -> bool {
        if handle.has_exited() {
            return true;
        }

        tokio::select! {
            biased;
            exit = handle.wait_exit() => {
                info!("Backend PID {} exited: {exit:?}", handle.pid());
                true
            }
            _ = self.clock.sleep(timeout) => handle.has_exited(),
        }
    }

    async fn force_terminate(&self, handle: &ProcessHandle, timeout: Duration) {
        let pid = handle.pid();
        let timed_out = SupervisorError::ShutdownTimeout {
            pid,
            timeout_ms: timeout.as_millis() as u64,
            location: ErrorLocation::from(Location::caller()),
        };
        warn!("{timed_out}, escalating to forced termination");

        self.set_phase(ShutdownPhase::ForceKilling);
        if let Err(e) = kill_process_tree(pid).await {
            error!("Forced termination failed: {e}");
        }

        if !self
            .wait_for_exit(handle, self.settings.kill_exit_wait())
            .await
        {
            warn!("Backend PID {pid} did not report exit after forced termination");
        }
    }

    /// Wait for the OS to release the backend's port and record the result.
    async fn await_port_release(&self, port: u16) -> bool {
        let started = self.clock.now();
        let released = self
            .allocator
            .wait_for_port_release(
                port,
                self.settings.release_poll_interval(),
                self.settings.release_wait(),
            )
            .await;

        let status = if released {
            PortStatus::Free
        } else {
            PortStatus::Unknown
        };
        self.state.lock().lease = Some(PortLease { port, status });

        if released {
            if let Some(ref dir) = self.lease_dir {
                LeaseFile::remove(dir);
            }
        } else {
            let release_timeout = SupervisorError::PortReleaseTimeout {
                port,
                waited_ms: (self.clock.now() - started).as_millis() as u64,
                location: ErrorLocation::from(Location::caller()),
            };
            warn!("{release_timeout}, continuing without confirmation");
        }

        released
    }
}
