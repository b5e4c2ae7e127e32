mod health_check_config;
mod health_report;
mod probe;

pub use health_check_config::HealthCheckConfig;
pub use health_report::{HealthReport, Readiness};
pub use probe::{HEALTH_PATH, HealthProbe};
