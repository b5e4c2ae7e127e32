mod coordinator;
mod shutdown_outcome;
mod shutdown_phase;
mod shutdown_request;

pub use coordinator::{SHUTDOWN_PATH, ShutdownCoordinator};
pub use shutdown_outcome::ShutdownOutcome;
pub use shutdown_phase::ShutdownPhase;
pub use shutdown_request::ShutdownRequest;
