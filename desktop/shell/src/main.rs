//! sidecar-shell - headless desktop host for the sidecar backend
//!
//! Loads configuration, starts the backend under supervision and turns
//! stdin lines, OS signals and panics into lifecycle triggers. Lifecycle
//! events are printed to stdout as JSON lines; logs go to stderr and the
//! rotating log file.
//!
//! Usage:
//!   sidecar-shell [--data-dir <dir>] [--backend <path>]

mod cli;
mod command;
mod logging;
mod output;
mod triggers;

#[cfg(test)]
mod tests;

use crate::cli::Cli;
use crate::command::{ShellCommand, ShellInput};
use crate::logging::{current_log_path, setup_logging};
use crate::output::{ExitReport, emit};
use crate::triggers::{install_panic_hook, install_signal_handlers};

use sidecar::{LifecycleEvent, ShutdownOutcome, ShutdownTrigger, Supervisor, SupervisorConfig};

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<i32, Box<dyn Error>> {
    let data_dir = cli
        .resolve_data_dir()
        .ok_or("No platform data directory; pass --data-dir")?;
    std::fs::create_dir_all(&data_dir)?;

    let mut config = SupervisorConfig::load_or_create(&data_dir)?;
    if let Some(backend) = cli.backend {
        config.backend.executable = backend;
    }
    config.validate()?;

    setup_logging(&data_dir, &config.logging)?;
    info!("Starting sidecar-shell v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", data_dir.display());
    info!(
        "Log file: {}",
        current_log_path(&data_dir, &config.logging).display()
    );

    let supervisor = Arc::new(Supervisor::new(config, data_dir)?);
    let mut events = supervisor.subscribe();

    let (input_tx, mut inputs) = mpsc::unbounded_channel();
    install_panic_hook(Arc::clone(&supervisor));
    install_signal_handlers(input_tx.clone());
    spawn_stdin_reader(input_tx);

    // Startup runs beside the input loop so a close or signal can cut it short
    let starting = Arc::clone(&supervisor);
    let startup = tokio::spawn(async move {
        match starting.start().await {
            Ok(port) => info!("Backend ready on port {port}"),
            Err(e) => error!("Backend failed to start: {e}"),
        }
    });

    let trigger = serve(&supervisor, &mut events, &mut inputs).await;

    let mut outcome = stop(&supervisor, trigger).await;

    // A startup that had not reached the transition lock may spawn after the stop
    startup.abort();
    let _ = startup.await;
    if supervisor.pid().is_some() {
        warn!("Backend spawned while stopping, stopping again");
        outcome = stop(&supervisor, trigger).await;
    }
    info!("Shutdown complete: {outcome:?}");

    drain_events(&mut events);
    emit(&ExitReport::new(trigger, outcome));

    Ok(trigger.exit_code())
}

async fn stop(supervisor: &Supervisor, trigger: ShutdownTrigger) -> ShutdownOutcome {
    match trigger {
        ShutdownTrigger::WindowClose => supervisor.begin_orderly_close().await,
        other => supervisor.shutdown_for(other).await,
    }
}

/// Print lifecycle events and answer commands until one ends the session.
///
/// EOF on stdin means app quit.
async fn serve(
    supervisor: &Supervisor,
    events: &mut broadcast::Receiver<LifecycleEvent>,
    inputs: &mut mpsc::UnboundedReceiver<ShellInput>,
) -> ShutdownTrigger {
    let mut events_open = true;

    loop {
        tokio::select! {
            event = events.recv(), if events_open => match event {
                Ok(event) => emit(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event output lagged, {skipped} events dropped");
                }
                Err(RecvError::Closed) => events_open = false,
            },
            input = inputs.recv() => {
                let line = match input {
                    Some(ShellInput::Line(line)) => line,
                    Some(ShellInput::Signal(sig)) => return ShutdownTrigger::Signal(sig),
                    Some(ShellInput::Eof) | None => {
                        info!("Stdin closed, quitting");
                        return ShutdownTrigger::AppQuit;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<ShellCommand>() {
                    Ok(ShellCommand::Close) => return ShutdownTrigger::WindowClose,
                    Ok(ShellCommand::Quit) => return ShutdownTrigger::AppQuit,
                    Ok(ShellCommand::Unresponsive) => {
                        return ShutdownTrigger::RendererUnresponsive;
                    }
                    Ok(ShellCommand::Health) => emit(&supervisor.request_health().await),
                    Ok(ShellCommand::Status) => emit(&supervisor.status()),
                    Ok(ShellCommand::Panic) => panic!("panic requested from stdin"),
                    Err(e) => warn!("{e}"),
                }
            }
        }
    }
}

/// Print events published while shutting down.
fn drain_events(events: &mut broadcast::Receiver<LifecycleEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => emit(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Event output lagged, {skipped} events dropped");
            }
            Err(_) => break,
        }
    }
}

/// Read stdin on a detached thread so a blocked read never holds up
/// runtime shutdown.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<ShellInput>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(ShellInput::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
        let _ = tx.send(ShellInput::Eof);
    });
}
