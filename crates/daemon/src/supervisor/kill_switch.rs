// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! KillSwitch: per-build timeout watchdog.

use std::time::Duration;

use bsup_core::{BuildId, Clock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Supervisor;

/// Outcome of an armed kill switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KillSwitchExit {
    /// Disarmed before the deadline.
    Disarmed,
    /// Deadline passed while the build was running; teardown was triggered.
    Fired,
    /// Deadline passed but the build had already left the running phase.
    Idle,
}

/// Sleep for `timeout`, then time out `build` if it is still running.
pub(crate) async fn run<C: Clock>(
    supervisor: Supervisor<C>,
    build: BuildId,
    timeout: Duration,
    disarm: CancellationToken,
) -> KillSwitchExit {
    debug!(%build, timeout_ms = timeout.as_millis() as u64, "kill switch armed");
    tokio::select! {
        biased;
        _ = disarm.cancelled() => {
            debug!(%build, "kill switch disarmed");
            return KillSwitchExit::Disarmed;
        }
        _ = tokio::time::sleep(timeout) => {}
    }

    if !supervisor.mark_timed_out(build) {
        debug!(%build, "kill switch woke after build ended");
        return KillSwitchExit::Idle;
    }
    warn!(%build, timeout_ms = timeout.as_millis() as u64, "build exceeded timeout, terminating");
    supervisor.finalize(build).await;
    KillSwitchExit::Fired
}
