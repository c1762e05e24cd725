// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot completion signal shared between a drainer and its waiters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Resolves at most once; resolving again is a no-op.
///
/// Cloning shares the same underlying signal.
#[derive(Debug, Clone, Default)]
pub(crate) struct DoneSignal {
    resolved: Arc<AtomicBool>,
    token: CancellationToken,
}

impl DoneSignal {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns true if this call was the one that resolved the signal.
    pub(crate) fn resolve(&self) -> bool {
        if self.resolved.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    #[cfg(test)]
    pub(crate) fn is_resolved(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn wait(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
