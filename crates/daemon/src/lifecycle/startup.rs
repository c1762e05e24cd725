// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::time::Instant;

use fs2::FileExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::control::ControlSurface;
use crate::listener::Listener;
use crate::supervisor::Supervisor;

use super::{Config, DaemonState, LifecycleError, StartupResult};

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // the PID file belongs to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // 3. Bind (LAST - only after all validation passes)
    let tcp = TcpListener::bind(config.bind)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.bind, e))?;

    let supervisor = Supervisor::new(config.supervisor);
    let surface = ControlSurface::new(supervisor.clone(), config.build.clone());
    let listener = Listener::new(tcp, surface, config.ipc_timeout);

    info!(
        addr = ?listener.local_addr().ok(),
        command = %config.build.command,
        timeout_secs = config.build.timeout.as_secs(),
        "Daemon started"
    );

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            supervisor,
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.lock_path) {
            warn!("Failed to remove PID file during cleanup: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
