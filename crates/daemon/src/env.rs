// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;
use crate::supervisor::DEFAULT_TIMEOUT;

/// Default control API address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Resolve state directory: BSUP_STATE_DIR > XDG_STATE_HOME/bsup > ~/.local/state/bsup
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("BSUP_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("bsup"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/bsup"))
}

/// Control API listen address (`BSUP_BIND`).
pub fn bind_addr() -> Result<SocketAddr, LifecycleError> {
    let raw = std::env::var("BSUP_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    raw.parse().map_err(|_| LifecycleError::InvalidBind(raw))
}

/// Build command line (`BSUP_BUILD_CMD`), if configured.
pub fn build_command() -> Option<String> {
    std::env::var("BSUP_BUILD_CMD").ok().filter(|s| !s.trim().is_empty())
}

/// Per-build timeout (default 6h, `BSUP_TIMEOUT_SECS`).
pub fn build_timeout() -> Duration {
    std::env::var("BSUP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// Grace period between SIGTERM and SIGKILL (default 10s, `BSUP_KILL_GRACE_MS`).
pub fn kill_grace() -> Duration {
    std::env::var("BSUP_KILL_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    std::env::var("BSUP_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
