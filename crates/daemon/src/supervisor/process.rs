// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process creation and termination.

use std::process::Stdio;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Why a termination request was not delivered.
#[derive(Debug, Error)]
pub(crate) enum TerminateError {
    #[error("process already exited")]
    ProcessAlreadyExited,

    #[error("failed to signal process: {0}")]
    Signal(#[from] Errno),
}

/// Spawn `argv` with the daemon's environment, capturing stdout and stderr.
///
/// Stdin is closed so a build can never block waiting on the daemon's terminal.
pub(crate) fn spawn(argv: &[String]) -> std::io::Result<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"))?;
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Send SIGTERM to `pid`.
pub(crate) fn terminate(pid: u32) -> Result<(), TerminateError> {
    let pid = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(TerminateError::ProcessAlreadyExited),
        Err(e) => Err(TerminateError::Signal(e)),
    }
}

/// Request termination, then reap the child.
///
/// A child still alive `grace` after SIGTERM is killed outright. Returns the
/// exit code on a normal exit, `None` when the child died from a signal or
/// could not be awaited.
pub(crate) async fn terminate_and_wait(mut child: Child, grace: Duration) -> Option<i32> {
    match child.id() {
        Some(pid) => match terminate(pid) {
            Ok(()) => debug!(pid, "sent SIGTERM"),
            Err(TerminateError::ProcessAlreadyExited) => debug!(pid, "process already exited"),
            Err(e) => warn!(pid, error = %e, "failed to terminate process"),
        },
        None => debug!("process already reaped"),
    }

    let status = match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(grace_ms = grace.as_millis() as u64, "process ignored SIGTERM, killing");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill process");
            }
            child.wait().await
        }
    };

    exit_code(status)
}

/// Own `child` until it exits, terminating it first if `terminate` fires.
///
/// `exited` is cancelled when the child exits on its own, which may be well
/// before its output pipes close if a descendant inherited them.
pub(crate) async fn reap(
    mut child: Child,
    terminate: CancellationToken,
    exited: CancellationToken,
    grace: Duration,
) -> Option<i32> {
    let status = tokio::select! {
        biased;
        _ = terminate.cancelled() => return terminate_and_wait(child, grace).await,
        status = child.wait() => status,
    };
    exited.cancel();
    exit_code(status)
}

fn exit_code(status: std::io::Result<std::process::ExitStatus>) -> Option<i32> {
    match status {
        Ok(status) => {
            debug!(%status, "process exited");
            status.code()
        }
        Err(e) => {
            warn!(error = %e, "failed waiting for process exit");
            None
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
