//! JSON lines on stdout, one per event or reply.

use sidecar::{ShutdownOutcome, ShutdownTrigger};

use serde::Serialize;
use tracing::error;

/// Final line written before the host exits.
#[derive(Debug, Serialize)]
pub struct ExitReport {
    pub trigger: String,
    #[serde(flatten)]
    pub outcome: ShutdownOutcome,
    pub exit_code: i32,
}

impl ExitReport {
    pub fn new(trigger: ShutdownTrigger, outcome: ShutdownOutcome) -> Self {
        Self {
            trigger: trigger.to_string(),
            outcome,
            exit_code: trigger.exit_code(),
        }
    }
}

pub fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("Failed to serialize output line: {e}"),
    }
}
