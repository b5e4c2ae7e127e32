//! Supervisor for a localhost backend process hosted by a desktop shell.
//!
//! The [`Supervisor`] allocates a port, spawns the backend, waits for its
//! health endpoint and tears it down through a single idempotent shutdown
//! path, whatever triggered it.

pub mod clock;
pub mod config;
pub mod health;
pub mod lease;
pub mod port;
pub mod process;
pub mod shutdown;
pub mod state;
pub mod supervisor;

mod error;

pub use error::{Result as SupervisorResult, SupervisorError};

pub use clock::{Clock, SharedClock, TokioClock};
pub use config::SupervisorConfig;
pub use health::{HealthCheckConfig, HealthReport};
pub use port::{PortAllocator, PortLease, PortStatus};
pub use shutdown::{ShutdownOutcome, ShutdownPhase, ShutdownRequest};
pub use supervisor::{LifecycleEvent, ShutdownTrigger, Supervisor, SupervisorStatus};

#[cfg(test)]
mod tests;
