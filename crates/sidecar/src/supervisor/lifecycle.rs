//! Backend lifecycle: start, health, shutdown and event publication.

use crate::clock::{SharedClock, tokio_clock};
use crate::config::SupervisorConfig;
use crate::health::{HealthCheckConfig, HealthProbe, HealthReport};
use crate::lease::{LeaseFile, LeaseRecord};
use crate::port::{PortAllocator, PortLease, PortStatus, SharedPortProbe, default_probe};
use crate::process::{
    BackendEnv, BackendProcess, BackendState, LaunchSpec, ProcessHandle, ProcessLauncher,
};
use crate::shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownRequest};
use crate::state::SharedState;
use crate::supervisor::{LifecycleEvent, ShutdownTrigger, SupervisorStatus};
use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use error_location::ErrorLocation;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 32;

/// Owns the one backend process and everything known about it.
///
/// Responsibilities:
/// - Allocate a port and spawn the backend
/// - Wait for the health endpoint before announcing readiness
/// - Funnel every termination trigger into the shutdown coordinator
/// - Publish lifecycle events and status to the host
pub struct Supervisor {
    config: SupervisorConfig,
    data_dir: PathBuf,
    state: SharedState,
    allocator: Arc<PortAllocator>,
    launcher: ProcessLauncher,
    health: HealthProbe,
    coordinator: Arc<ShutdownCoordinator>,
    transition: Arc<Mutex<()>>,
    events_tx: broadcast::Sender<LifecycleEvent>,
    status_tx: Arc<watch::Sender<SupervisorStatus>>,
}

impl Supervisor {
    /// Create a supervisor using the platform port probe and the tokio clock.
    pub fn new(config: SupervisorConfig, data_dir: PathBuf) -> SupervisorResult<Self> {
        Self::with_components(config, data_dir, default_probe(), tokio_clock())
    }

    pub fn with_components(
        config: SupervisorConfig,
        data_dir: PathBuf,
        probe: SharedPortProbe,
        clock: SharedClock,
    ) -> SupervisorResult<Self> {
        let state = SharedState::new();
        let transition = Arc::new(Mutex::new(()));
        let allocator = Arc::new(PortAllocator::new(
            probe,
            clock.clone(),
            config.ports.window,
        ));
        let health_config = HealthCheckConfig::from(&config.health);
        let health = HealthProbe::new(clock.clone(), health_config.attempt_timeout)?;
        let coordinator = Arc::new(ShutdownCoordinator::new(
            state.clone(),
            allocator.clone(),
            clock,
            config.shutdown.clone(),
            transition.clone(),
            Some(data_dir.clone()),
        )?);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (status_tx, _) = watch::channel(SupervisorStatus::Stopped);

        Ok(Self {
            config,
            data_dir,
            state,
            allocator,
            launcher: ProcessLauncher::new(),
            health,
            coordinator,
            transition,
            events_tx,
            status_tx: Arc::new(status_tx),
        })
    }

    /// Start the backend and wait until it is healthy.
    ///
    /// Emits [`LifecycleEvent::Ready`] on success and
    /// [`LifecycleEvent::NotReady`] on failure. A backend that was spawned
    /// but never became healthy is killed before returning.
    pub async fn start(&self) -> SupervisorResult<u16> {
        let result = self.start_backend().await;

        match &result {
            Ok(port) => {
                let port = *port;
                info!("Backend started successfully on port {port}");
                self.set_status(SupervisorStatus::Running { port });
                self.emit(LifecycleEvent::Ready { port });
            }
            Err(
                SupervisorError::BackendAlreadyRunning { .. } | SupervisorError::ShuttingDown { .. },
            ) => {
                // Rejected without touching the running (or stopping) backend
            }
            Err(e) => {
                error!("Backend startup failed: {e}");
                if self.state.backend().is_some() {
                    self.coordinator.stop(ShutdownRequest::immediate()).await;
                }
                self.set_status(SupervisorStatus::Failed {
                    error: e.to_string(),
                });
                self.emit(LifecycleEvent::NotReady {
                    error: e.to_string(),
                    recovery_hint: e.recovery_hint().into(),
                });
            }
        }

        result
    }

    async fn start_backend(&self) -> SupervisorResult<u16> {
        let _transition = self.transition.lock().await;

        if self.coordinator.is_stopping() {
            return Err(SupervisorError::ShuttingDown {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if let Some(backend) = self.state.backend() {
            return Err(SupervisorError::BackendAlreadyRunning {
                pid: backend.pid(),
                port: backend.port,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.set_status(SupervisorStatus::Starting);
        self.ensure_data_dirs()?;

        let excluded = self.reclaim_previous_ports().await?;
        let port = self
            .allocator
            .find_available_port_excluding(self.config.ports.start_port, &excluded)?;

        let spec = self.launch_spec(port);
        let handle = self.launcher.spawn(&spec).await?;
        {
            let mut state = self.state.lock();
            state.backend = Some(BackendProcess::new(handle.clone(), port));
            state.lease = Some(PortLease::bound(port));
        }

        if let Err(e) = LeaseFile::write(&self.data_dir, &LeaseRecord::new(handle.pid(), port)) {
            warn!("Failed to write lease file: {e}");
        }

        self.watch_unexpected_exit(handle.clone());

        let health_config = HealthCheckConfig::from(&self.config.health);
        let readiness = tokio::select! {
            biased;
            _ = self.stop_requested() => {
                info!("Shutdown requested during startup, abandoning health wait");
                return Err(SupervisorError::ShuttingDown {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            exit = handle.wait_exit() => {
                return Err(SupervisorError::BackendExitedDuringStartup {
                    code: exit.code,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            ready = self.health.wait_until_ready(port, &health_config) => ready?,
        };
        debug!(
            "Readiness confirmed after {} attempts, backoff {:?}",
            readiness.attempts, readiness.retry_delays
        );

        if self.coordinator.is_stopping() {
            return Err(SupervisorError::ShuttingDown {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if let Some(backend) = self.state.lock().backend.as_mut() {
            backend.state = BackendState::Ready;
        }

        Ok(port)
    }

    /// Resolves once a stop has taken the shutdown gate.
    ///
    /// The stop itself then waits on `transition`, so startup has to give
    /// way for it to proceed.
    async fn stop_requested(&self) {
        let mut phase = self.coordinator.subscribe_phase();
        while !self.coordinator.is_stopping() {
            if phase.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Ports that must not be handed to the new backend.
    ///
    /// A port whose release was never confirmed, by this supervisor or by a
    /// crashed predecessor recorded in the lease file, is waited on once
    /// more; if it is still held it is excluded from the scan.
    async fn reclaim_previous_ports(&self) -> SupervisorResult<Vec<u16>> {
        let mut candidates = Vec::new();

        if let Some(record) = LeaseFile::ensure_not_owned_elsewhere(&self.data_dir)? {
            if record.is_stale() {
                warn!(
                    "Found stale lease from supervisor PID {} (backend PID {}, port {})",
                    record.supervisor_pid, record.backend_pid, record.port
                );
            }
            candidates.push(record.port);
        }

        let lease = self.state.lock().lease;
        if let Some(lease) = lease
            && lease.is_unconfirmed()
            && !candidates.contains(&lease.port)
        {
            candidates.push(lease.port);
        }

        let settings = &self.config.shutdown;
        let mut excluded = Vec::new();
        for port in candidates {
            let released = self
                .allocator
                .wait_for_port_release(
                    port,
                    settings.release_poll_interval(),
                    settings.release_wait(),
                )
                .await;

            if released {
                info!("Previous port {port} confirmed released");
                self.state.lock().lease = Some(PortLease {
                    port,
                    status: PortStatus::Free,
                });
            } else {
                warn!("Previous port {port} still held, excluding it");
                excluded.push(port);
            }
        }

        if excluded.is_empty() {
            LeaseFile::remove(&self.data_dir);
        }

        Ok(excluded)
    }

    fn launch_spec(&self, port: u16) -> LaunchSpec {
        let backend = &self.config.backend;
        let env = BackendEnv::new(
            port,
            self.data_dir.clone(),
            backend.resolve_workspace_dir(&self.data_dir),
        )
        .with_extra(backend.env.clone());

        LaunchSpec {
            executable: backend.resolve_executable(&self.data_dir),
            args: backend.args.clone(),
            working_dir: backend.resolve_working_dir(&self.data_dir),
            env,
        }
    }

    /// Report a backend that exits while no shutdown is running.
    ///
    /// The reference is cleared and the port marked unconfirmed. Only a
    /// backend that had become ready produces `BackendExited`; an exit during
    /// startup is reported by `start` itself.
    fn watch_unexpected_exit(&self, handle: ProcessHandle) {
        let state = self.state.clone();
        let coordinator = self.coordinator.clone();
        let events_tx = self.events_tx.clone();
        let status_tx = self.status_tx.clone();

        tokio::spawn(async move {
            let exit = handle.wait_exit().await;
            if coordinator.is_stopping() {
                return;
            }

            let pid = handle.pid();
            let gone = {
                let mut state = state.lock();
                let gone = state.backend.take_if(|backend| backend.pid() == pid);
                if let Some(ref backend) = gone {
                    state.lease = Some(PortLease {
                        port: backend.port,
                        status: PortStatus::Unknown,
                    });
                }
                gone
            };

            let Some(mut backend) = gone else {
                return;
            };
            let was_ready = backend.state == BackendState::Ready;
            backend.state = BackendState::Gone;
            warn!(
                "Backend PID {pid} on port {} exited unexpectedly: {exit:?}",
                backend.port
            );

            if was_ready {
                status_tx.send_replace(SupervisorStatus::Failed {
                    error: format!("backend exited unexpectedly (code {:?})", exit.code),
                });
                let _ = events_tx.send(LifecycleEvent::BackendExited {
                    pid,
                    code: exit.code,
                });
            }
        });
    }

    /// Single health check against the running backend.
    pub async fn request_health(&self) -> HealthReport {
        match self.port() {
            Some(port) => self.health.check_once(port).await,
            None => HealthReport::not_running(),
        }
    }

    /// The one shutdown entry point.
    pub async fn request_shutdown(&self, request: ShutdownRequest) -> ShutdownOutcome {
        if !self.coordinator.is_stopping() && self.state.backend().is_some() {
            self.set_status(SupervisorStatus::ShuttingDown);
        }

        let outcome = self.coordinator.stop(request).await;
        if let ShutdownOutcome::Completed {
            forced,
            port_released,
        } = outcome
        {
            self.set_status(SupervisorStatus::Stopped);
            self.emit(LifecycleEvent::Stopped {
                forced,
                port_released,
            });
        }

        outcome
    }

    pub async fn shutdown_for(&self, trigger: ShutdownTrigger) -> ShutdownOutcome {
        info!("Shutdown triggered by {trigger}");
        self.request_shutdown(trigger.request(&self.config.shutdown))
            .await
    }

    /// What a window close handler awaits before destroying the window.
    ///
    /// When another trigger already started the shutdown this waits for
    /// it to finish instead of returning early.
    pub async fn begin_orderly_close(&self) -> ShutdownOutcome {
        let outcome = self.shutdown_for(ShutdownTrigger::WindowClose).await;
        if outcome == ShutdownOutcome::AlreadyInProgress {
            self.coordinator.wait_idle().await;
        }
        outcome
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events_tx.subscribe()
    }

    /// Get current status.
    pub fn status(&self) -> SupervisorStatus {
        if self.coordinator.is_stopping() {
            return SupervisorStatus::ShuttingDown;
        }
        self.status_tx.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn watch_status(&self) -> watch::Receiver<SupervisorStatus> {
        self.status_tx.subscribe()
    }

    /// Port of the tracked backend.
    pub fn port(&self) -> Option<u16> {
        self.state.backend().map(|backend| backend.port)
    }

    /// Backend process PID (if running).
    pub fn pid(&self) -> Option<u32> {
        self.state.backend().map(|backend| backend.pid())
    }

    /// Last known port lease, confirmed or not.
    pub fn port_lease(&self) -> Option<PortLease> {
        self.state.lock().lease
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Ensure data directory structure exists.
    fn ensure_data_dirs(&self) -> SupervisorResult<()> {
        let workspace = self.config.backend.resolve_workspace_dir(&self.data_dir);
        for dir in [self.data_dir.clone(), workspace] {
            std::fs::create_dir_all(&dir).map_err(|e| SupervisorError::DataDirCreation {
                path: dir.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;
        }
        Ok(())
    }

    fn set_status(&self, status: SupervisorStatus) {
        debug!("Supervisor status: {status:?}");
        self.status_tx.send_replace(status);
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }
}
