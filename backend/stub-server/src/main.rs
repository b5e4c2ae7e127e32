mod error;
mod logger;
mod routes;
mod stub_config;


use crate::routes::{AppState, bind_listener, build_router};
use crate::stub_config::StubConfig;

use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use log::{error, info, warn};
use sidecar::process::is_process_running;
use tokio::sync::watch;

/// Exit code used when simulating a crash
const CRASH_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = StubConfig::from_env()?;

    logger::initialize(config.log_level)?;

    info!("Starting sidecar-stub v{}", env!("CARGO_PKG_VERSION"));
    if let Some(ref dir) = config.workspace_dir {
        info!("Workspace directory: {}", dir.display());
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let app = build_router(AppState {
        started: Instant::now(),
        ready_delay: config.ready_delay,
        ignore_shutdown: config.ignore_shutdown,
        shutdown_tx: shutdown_tx.clone(),
    });

    let listener = bind_listener(config.port).await?;

    // Spawn signal handler for graceful shutdown
    let shutdown_for_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                shutdown_for_signal.send_replace(true);
            }
            Err(e) => {
                error!("Failed to listen for SIGINT: {e}");
            }
        }
    });

    // Exit on our own once the supervisor is gone
    if let Some(pid) = config.supervisor_pid {
        let shutdown_for_orphan = shutdown_tx.clone();
        let poll = config.supervisor_poll;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll).await;
                if !is_process_running(pid) {
                    warn!("Supervisor PID {pid} is gone, shutting down");
                    shutdown_for_orphan.send_replace(true);
                    break;
                }
            }
        });
    }

    if let Some(delay) = config.exit_after {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            error!("Simulated crash after {delay:?}");
            std::process::exit(CRASH_EXIT_CODE);
        });
    }

    info!("Server ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|requested| *requested).await;
            info!("Graceful shutdown complete");
        })
        .await?;

    Ok(())
}
