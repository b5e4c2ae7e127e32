mod lifecycle;
mod lifecycle_event;
mod supervisor_status;
mod trigger;

pub use lifecycle::Supervisor;
pub use lifecycle_event::LifecycleEvent;
pub use supervisor_status::SupervisorStatus;
pub use trigger::ShutdownTrigger;
