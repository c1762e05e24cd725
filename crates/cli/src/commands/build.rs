// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bsup start | status | cancel | wait`

use std::time::{Duration, Instant};

use anyhow::Result;
use bsup_core::{Phase, StatusReport};
use bsup_daemon::DaemonClient;

use crate::client::into_cli_error;
use crate::exit_error::ExitError;
use crate::output::{render_report, wait_exit_code, OutputFormat};

pub async fn handle_start(client: &DaemonClient) -> Result<()> {
    let body = client.start().await.map_err(into_cli_error)?;
    print!("{}", body);
    Ok(())
}

pub async fn handle_status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Text => client.status_text().await.map_err(into_cli_error)?,
        OutputFormat::Json => {
            let report = client.status().await.map_err(into_cli_error)?;
            render_report(&report, format)?
        }
    };
    print!("{}", text);
    Ok(())
}

/// Returns once the daemon has torn the build down.
pub async fn handle_cancel(client: &DaemonClient) -> Result<()> {
    let body = client.cancel().await.map_err(into_cli_error)?;
    print!("{}", body);
    Ok(())
}

pub async fn handle_wait(
    client: &DaemonClient,
    interval: Duration,
    timeout: Option<Duration>,
    format: OutputFormat,
) -> Result<()> {
    let report = wait_for_terminal(client, interval, timeout).await?;
    print!("{}", render_report(&report, format)?);
    match wait_exit_code(&report) {
        0 => Ok(()),
        code => Err(ExitError::silent(code).into()),
    }
}

/// Poll until the current build is finished or cancelled.
///
/// Fails with exit code 1 when no build was ever started, and 2 when
/// `timeout` elapses first.
pub(crate) async fn wait_for_terminal(
    client: &DaemonClient,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<StatusReport> {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        let report = client.status().await.map_err(into_cli_error)?;
        if report.phase.is_terminal() {
            return Ok(report);
        }
        if report.phase == Phase::Ready {
            return Err(ExitError::new(1, "No build has been started").into());
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ExitError::new(2, format!("Timeout waiting for {}", report.build)).into());
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
