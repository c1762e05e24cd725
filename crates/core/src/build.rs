// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build record and its derived lifecycle phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one build attempt.
///
/// Ids increase monotonically for the lifetime of a daemon, so a task bound to
/// an older build can always tell that it is stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl BuildId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build-{}", self.0)
    }
}

/// Lifecycle phase of a build, derived from its timestamps.
///
/// Ordering follows the lifecycle: `Ready < Running < {Finished, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Ready,
    Running,
    Finished,
    Cancelled,
}

impl Phase {
    /// Both `Finished` and `Cancelled` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Cancelled)
    }

    /// Position in the lifecycle; terminal phases share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Ready => 0,
            Phase::Running => 1,
            Phase::Finished | Phase::Cancelled => 2,
        }
    }
}

crate::simple_display! {
    Phase {
        Ready => "ready",
        Running => "running",
        Finished => "finished",
        Cancelled => "cancelled",
    }
}

/// Which child output stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    Stream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Mutable record of one build attempt.
///
/// Every timestamp, the timeout flag and the exit code can be set at most
/// once. The `mark_*` setters return whether they changed anything, and refuse
/// any change that would move the phase backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRecord {
    id: BuildId,
    started_at_ms: Option<u64>,
    ended_at_ms: Option<u64>,
    cancelled_at_ms: Option<u64>,
    timed_out: bool,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<i32>,
}

impl BuildRecord {
    pub fn new(id: BuildId) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn id(&self) -> BuildId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        if self.started_at_ms.is_none() {
            Phase::Ready
        } else if self.cancelled_at_ms.is_some() {
            Phase::Cancelled
        } else if self.ended_at_ms.is_some() {
            Phase::Finished
        } else {
            Phase::Running
        }
    }

    pub fn mark_started(&mut self, at_ms: u64) -> bool {
        if self.started_at_ms.is_some() {
            return false;
        }
        self.started_at_ms = Some(at_ms);
        true
    }

    /// Only a running build can be cancelled.
    pub fn mark_cancelled(&mut self, at_ms: u64) -> bool {
        if self.phase() != Phase::Running {
            return false;
        }
        self.cancelled_at_ms = Some(at_ms);
        true
    }

    /// Ending a build that never started is refused.
    pub fn mark_ended(&mut self, at_ms: u64) -> bool {
        if self.started_at_ms.is_none() || self.ended_at_ms.is_some() {
            return false;
        }
        self.ended_at_ms = Some(at_ms);
        true
    }

    /// Only a running build can time out.
    pub fn mark_timed_out(&mut self) -> bool {
        if self.timed_out || self.phase() != Phase::Running {
            return false;
        }
        self.timed_out = true;
        true
    }

    pub fn set_exit_code(&mut self, code: i32) -> bool {
        if self.exit_code.is_some() {
            return false;
        }
        self.exit_code = Some(code);
        true
    }

    /// Append captured output. Ignored before start and after end.
    pub fn append(&mut self, stream: Stream, bytes: &[u8]) -> bool {
        if self.started_at_ms.is_none() || self.ended_at_ms.is_some() {
            return false;
        }
        match stream {
            Stream::Stdout => self.stdout.extend_from_slice(bytes),
            Stream::Stderr => self.stderr.extend_from_slice(bytes),
        }
        true
    }

    pub fn output(&self, stream: Stream) -> &[u8] {
        match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn ended_at_ms(&self) -> Option<u64> {
        self.ended_at_ms
    }

    pub fn cancelled_at_ms(&self) -> Option<u64> {
        self.cancelled_at_ms
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Elapsed time while running, total time once ended.
    pub fn duration_ms(&self, now_ms: u64) -> Option<u64> {
        let started = self.started_at_ms?;
        let until = self.ended_at_ms.unwrap_or(now_ms);
        Some(until.saturating_sub(started))
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
