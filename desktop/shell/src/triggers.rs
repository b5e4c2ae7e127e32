//! OS-level shutdown triggers: signals and the panic hook.

use crate::command::ShellInput;
use crate::output::{ExitReport, emit};

use sidecar::process::kill_process_tree;
use sidecar::{ShutdownOutcome, ShutdownTrigger, Supervisor};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

static PANICKING: AtomicBool = AtomicBool::new(false);

/// Forward SIGINT, SIGTERM and SIGHUP to the host loop, which runs the
/// shutdown and exits.
#[cfg(unix)]
pub fn install_signal_handlers(inputs: mpsc::UnboundedSender<ShellInput>) {
    std::thread::spawn(move || {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = match Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to register signal handlers: {e}");
                return;
            }
        };

        for sig in signals.forever() {
            info!("Received signal {sig}, shutting down...");
            if inputs.send(ShellInput::Signal(sig)).is_err() {
                break;
            }
        }
    });
}

#[cfg(not(unix))]
pub fn install_signal_handlers(inputs: mpsc::UnboundedSender<ShellInput>) {
    const SIGINT: i32 = 2;

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Received Ctrl+C, shutting down...");
        let _ = inputs.send(ShellInput::Signal(SIGINT));
    });
}

/// Best-effort forced stop of the backend on any panic, then exit 1.
///
/// The stop runs on a fresh runtime in its own thread since the panicking
/// thread may be a runtime worker.
pub fn install_panic_hook(supervisor: Arc<Supervisor>) {
    let default_hook = std::panic::take_hook();
    let budget = supervisor.config().shutdown.panic_timeout();

    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        if PANICKING.swap(true, Ordering::SeqCst) {
            return;
        }
        error!("Unhandled panic: {info}");

        let trigger = ShutdownTrigger::UnhandledPanic;
        let supervisor = Arc::clone(&supervisor);
        let cleanup = std::thread::spawn(move || emergency_stop(&supervisor, budget));
        match cleanup.join() {
            Ok(outcome) => emit(&ExitReport::new(trigger, outcome)),
            Err(_) => eprintln!("Backend cleanup panicked"),
        }

        std::process::exit(trigger.exit_code());
    }));
}

/// Stop through the supervisor within `budget`, falling back to killing
/// the backend tree directly.
fn emergency_stop(supervisor: &Supervisor, budget: Duration) -> ShutdownOutcome {
    // Release cannot be confirmed on the fallback path
    let killed = ShutdownOutcome::Completed {
        forced: true,
        port_released: false,
    };
    let pid = supervisor.pid();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build cleanup runtime: {e}");
            return ShutdownOutcome::NotRunning;
        }
    };

    runtime.block_on(async {
        let stop = supervisor.shutdown_for(ShutdownTrigger::UnhandledPanic);
        match tokio::time::timeout(budget, stop).await {
            Ok(outcome @ (ShutdownOutcome::Completed { .. } | ShutdownOutcome::NotRunning)) => {
                outcome
            }
            other => {
                // Gate held elsewhere or budget spent
                let Some(pid) = pid else {
                    return ShutdownOutcome::NotRunning;
                };
                warn!("Panic stop did not complete ({other:?}), killing PID {pid}");
                if let Err(e) = kill_process_tree(pid).await {
                    error!("Failed to kill backend PID {pid}: {e}");
                }
                killed
            }
        }
    })
}
