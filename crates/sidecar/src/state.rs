use crate::port::PortLease;
use crate::process::BackendProcess;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mutable supervisor state: the one backend and the last port lease.
///
/// Locked only for short, non-async sections. A poisoned lock is taken
/// over rather than propagated so shutdown cleanup always runs.
#[derive(Debug, Default)]
pub struct SupervisorState {
    pub backend: Option<BackendProcess>,
    pub lease: Option<PortLease>,
}

#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<SupervisorState>>);

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, SupervisorState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the tracked backend, if any.
    pub fn backend(&self) -> Option<BackendProcess> {
        self.lock().backend.clone()
    }
}
