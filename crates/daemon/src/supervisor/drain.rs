// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StreamDrainer: copies one child output stream into the build record.

use std::time::Duration;

use bsup_core::{BuildId, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::signal::DoneSignal;

/// Read sizing and backoff between reads.
///
/// A full buffer means more output is likely pending, so the drainer only
/// yields before reading again. A short read backs off briefly so a chatty
/// build does not take the record lock for every small write. Idle streams
/// cost nothing: the read itself waits for readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPacing {
    pub chunk_size: usize,
    pub partial_read_backoff: Duration,
    /// How long to keep taking buffered output once the child has exited.
    pub exit_drain_wait: Duration,
}

impl Default for DrainPacing {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            partial_read_backoff: Duration::from_millis(20),
            exit_drain_wait: Duration::from_millis(100),
        }
    }
}

impl DrainPacing {
    /// Delay before the next read, given the size of the last one.
    pub fn backoff_after(&self, read: usize) -> Duration {
        if read >= self.chunk_size {
            Duration::ZERO
        } else {
            self.partial_read_backoff
        }
    }
}

/// Destination for captured output.
pub(crate) trait OutputSink: Send + Sync + 'static {
    /// Append a chunk. Returns false once the run no longer accepts output.
    fn capture(&self, stream: Stream, bytes: &[u8]) -> bool;
}

/// Why a drainer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainExit {
    Eof,
    Stopped,
    /// The child exited and no more output arrived in time.
    ProcessExited,
    /// The sink refused output: the run was finalized or replaced.
    Detached,
    ReadError,
}

pub(crate) struct StreamDrainer<R, S> {
    pub(crate) build: BuildId,
    pub(crate) stream: Stream,
    pub(crate) reader: R,
    pub(crate) sink: S,
    pub(crate) stop: CancellationToken,
    /// Cancelled when the owning child exits.
    pub(crate) exited: CancellationToken,
    pub(crate) done: DoneSignal,
    pub(crate) pacing: DrainPacing,
}

impl<R, S> StreamDrainer<R, S>
where
    R: AsyncRead + Unpin + Send + 'static,
    S: OutputSink,
{
    /// Drain until EOF, child exit, stop, or detachment. The done signal is
    /// resolved on every exit path.
    ///
    /// A descendant may keep the pipe open after the child exits, so after
    /// exit the drainer only takes what arrives before a short deadline.
    pub(crate) async fn run(mut self) -> DrainExit {
        let (build, stream) = (self.build, self.stream);
        debug!(%build, %stream, "drainer started");

        let mut buf = vec![0u8; self.pacing.chunk_size.max(1)];
        let mut total = 0usize;
        let mut exit_deadline: Option<Instant> = None;
        let exit = loop {
            let read = if self.exited.is_cancelled() {
                let deadline =
                    *exit_deadline.get_or_insert_with(|| Instant::now() + self.pacing.exit_drain_wait);
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => break DrainExit::Stopped,
                    read = tokio::time::timeout_at(deadline, self.reader.read(&mut buf)) => match read {
                        Ok(read) => read,
                        Err(_) => break DrainExit::ProcessExited,
                    },
                }
            } else {
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => break DrainExit::Stopped,
                    _ = self.exited.cancelled() => continue,
                    read = self.reader.read(&mut buf) => read,
                }
            };
            let n = match read {
                Ok(0) => break DrainExit::Eof,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(%build, %stream, error = %e, "read failed");
                    break DrainExit::ReadError;
                }
            };
            if !self.sink.capture(stream, &buf[..n]) {
                break DrainExit::Detached;
            }
            total += n;

            let backoff = self.pacing.backoff_after(n);
            if backoff.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => break DrainExit::Stopped,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        };

        if self.done.resolve() {
            debug!(%build, %stream, bytes = total, exit = ?exit, "drainer done");
        }
        exit
    }
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
