// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon address resolution and error mapping for commands.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use bsup_daemon::{ClientError, DaemonClient};

use crate::exit_error::ExitError;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Resolve the daemon address: `--addr` > `BSUP_ADDR` > default.
pub fn daemon_addr(flag: Option<SocketAddr>) -> Result<SocketAddr> {
    if let Some(addr) = flag {
        return Ok(addr);
    }
    let raw = std::env::var("BSUP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    raw.parse().map_err(|_| anyhow!("invalid BSUP_ADDR: {}", raw))
}

pub fn connect(flag: Option<SocketAddr>, timeout: Duration) -> Result<DaemonClient> {
    Ok(DaemonClient::new(daemon_addr(flag)?).with_timeout(timeout))
}

/// Daemon refusals (4xx/5xx) become a plain message with exit code 1.
pub fn into_cli_error(e: ClientError) -> anyhow::Error {
    match e {
        ClientError::Http { body, .. } => ExitError::new(1, body).into(),
        ClientError::Connect { addr, .. } => {
            ExitError::new(1, format!("Daemon is not running at {}", addr)).into()
        }
        other => other.into(),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
