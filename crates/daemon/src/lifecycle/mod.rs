// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::net::SocketAddr;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::env;
use crate::listener::Listener;
use crate::supervisor::{BuildSpec, Supervisor, SupervisorConfig};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/bsup)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Control API address
    pub bind: SocketAddr,
    /// The build every `start` runs
    pub build: BuildSpec,
    pub supervisor: SupervisorConfig,
    /// Per-request read/write timeout
    pub ipc_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `command` overrides `BSUP_BUILD_CMD`; one of the two is required.
    pub fn load(command: Option<String>) -> Result<Self, LifecycleError> {
        let command = command
            .filter(|c| !c.trim().is_empty())
            .or_else(env::build_command)
            .ok_or(LifecycleError::NoBuildCommand)?;

        let mut config = Self::new(
            env::state_dir()?,
            env::bind_addr()?,
            BuildSpec::new(command, env::build_timeout()),
        );
        config.supervisor.kill_grace = env::kill_grace();
        config.ipc_timeout = env::ipc_timeout();
        Ok(config)
    }

    /// Configuration rooted at `state_dir` with default tuning.
    pub fn new(state_dir: PathBuf, bind: SocketAddr, build: BuildSpec) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
            bind,
            build,
            supervisor: SupervisorConfig::default(),
            ipc_timeout: Duration::from_secs(5),
        }
    }

    /// Directory and file name of `log_path`, as the log appender wants them.
    pub fn log_target(&self) -> (&Path, &OsStr) {
        let dir = self
            .log_path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(&self.state_dir);
        let file = self.log_path.file_name().unwrap_or(OsStr::new("daemon.log"));
        (dir, file)
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Shared with the control surface served by the listener
    pub supervisor: Supervisor,
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon state plus the listener to spawn.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: Listener,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// An active build is cancelled through the normal finalize path and
    /// awaited before the PID file is removed.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.supervisor.shutdown().await;

        // Lock is released when self.lock_file is dropped
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("No build command configured (set BSUP_BUILD_CMD or pass one)")]
    NoBuildCommand,

    #[error("Invalid bind address: {0}")]
    InvalidBind(String),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
