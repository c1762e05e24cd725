// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-build supervisor.
//!
//! A [`Supervisor`] owns the current [`BuildRecord`] and at most one child
//! process. Each run gets a reaper that owns the child, two stream drainers,
//! a kill switch and a completion waiter, all spawned as independent tasks. Natural completion, timeout and
//! explicit cancellation all end in [`Supervisor::finalize`], which performs
//! teardown exactly once per run.
//!
//! Run state sits behind a mutex that is never held across an await, so every
//! guard flag is checked and set in one non-suspending step.

mod drain;
mod kill_switch;
mod process;
mod signal;

pub use drain::DrainPacing;

use std::sync::Arc;
use std::time::Duration;

use bsup_core::{BuildId, BuildRecord, Clock, StatusReport, Stream, SystemClock};
use bsup_shell::LexerError;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use drain::{OutputSink, StreamDrainer};
use signal::DoneSignal;

/// Default per-build timeout: six hours.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// What to run and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Shell-style command line, split into argv at start.
    pub command: String,
    pub timeout: Duration,
}

impl BuildSpec {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self { command: command.into(), timeout }
    }
}

/// Supervisor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// How long a terminated child may take to exit before it is killed.
    pub kill_grace: Duration,
    pub pacing: DrainPacing,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { kill_grace: Duration::from_secs(10), pacing: DrainPacing::default() }
    }
}

/// Errors surfaced to callers of the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("build is already running")]
    AlreadyRunning,

    #[error("no running build to cancel")]
    NoActiveBuild,

    #[error("build command is empty")]
    EmptyCommand,

    #[error("invalid build command: {0}")]
    InvalidCommand(#[from] LexerError),

    #[error("failed to spawn '{program}': {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to the single-build supervisor. Clones share the same state.
pub struct Supervisor<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
}

impl<C: Clock> Clone for Supervisor<C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

struct Shared<C> {
    clock: C,
    config: SupervisorConfig,
    state: Mutex<RunState>,
    /// Notified whenever a run finishes teardown.
    idle: Notify,
}

#[derive(Default)]
struct RunState {
    record: BuildRecord,
    in_flight: bool,
    finalize_invoked: bool,
    /// Drainers may append to the record only while set.
    capturing: bool,
    active: Option<ActiveProcess>,
}

struct ActiveProcess {
    pid: Option<u32>,
    /// Resolves to the exit code once the child is reaped. Moved out by
    /// finalize.
    reaper: Option<JoinHandle<Option<i32>>>,
    tasks: RunTasks,
}

/// Cancellation handles for one run's tasks.
#[derive(Clone, Default)]
struct RunTasks {
    kill_switch: CancellationToken,
    stop_drain: CancellationToken,
    terminate: CancellationToken,
    /// Cancelled by the reaper when the child exits on its own.
    exited: CancellationToken,
    stdout_done: DoneSignal,
    stderr_done: DoneSignal,
}

impl Supervisor<SystemClock> {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_clock(SystemClock, config)
    }
}

impl<C: Clock> Supervisor<C> {
    pub fn with_clock(clock: C, config: SupervisorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock,
                config,
                state: Mutex::new(RunState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Spawn a new build and its supervising tasks.
    ///
    /// Returns as soon as the child is running. The previous build record is
    /// discarded.
    pub fn start(&self, spec: &BuildSpec) -> Result<BuildId, SupervisorError> {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        if state.in_flight {
            info!(build = %state.record.id(), "start rejected, build in flight");
            return Err(SupervisorError::AlreadyRunning);
        }
        let argv = bsup_shell::split(&spec.command)?;
        let Some(program) = argv.first().cloned() else {
            return Err(SupervisorError::EmptyCommand);
        };

        let build = state.record.id().next();
        state.record = BuildRecord::new(build);
        state.in_flight = true;
        state.finalize_invoked = false;

        let mut child = match process::spawn(&argv) {
            Ok(child) => child,
            Err(source) => {
                state.in_flight = false;
                error!(%build, %program, error = %source, "failed to spawn build");
                return Err(SupervisorError::SpawnError { program, source });
            }
        };
        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        state.record.mark_started(self.shared.clock.epoch_ms());
        state.capturing = true;
        let tasks = RunTasks::default();
        let reaper = tokio::spawn(process::reap(
            child,
            tasks.terminate.clone(),
            tasks.exited.clone(),
            self.shared.config.kill_grace,
        ));
        state.active = Some(ActiveProcess { pid, reaper: Some(reaper), tasks: tasks.clone() });
        drop(guard);

        info!(
            %build,
            pid,
            argv = ?argv,
            timeout_ms = spec.timeout.as_millis() as u64,
            "build started"
        );

        self.spawn_drainer(build, Stream::Stdout, stdout, &tasks, &tasks.stdout_done);
        self.spawn_drainer(build, Stream::Stderr, stderr, &tasks, &tasks.stderr_done);
        tokio::spawn(kill_switch::run(
            self.clone(),
            build,
            spec.timeout,
            tasks.kill_switch.clone(),
        ));
        tokio::spawn(self.clone().await_completion(build, tasks.stdout_done, tasks.stderr_done));
        Ok(build)
    }

    fn spawn_drainer<R>(
        &self,
        build: BuildId,
        stream: Stream,
        reader: Option<R>,
        tasks: &RunTasks,
        done: &DoneSignal,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let Some(reader) = reader else {
            warn!(%build, %stream, "stream not captured");
            done.resolve();
            return;
        };
        let drainer = StreamDrainer {
            build,
            stream,
            reader,
            sink: RunSink { supervisor: self.clone(), build },
            stop: tasks.stop_drain.clone(),
            exited: tasks.exited.clone(),
            done: done.clone(),
            pacing: self.shared.config.pacing,
        };
        tokio::spawn(drainer.run());
    }

    /// Waits for both drainers to finish, then finalizes the run. Drainers
    /// finish on EOF or shortly after the child exits.
    async fn await_completion(self, build: BuildId, stdout: DoneSignal, stderr: DoneSignal) {
        stdout.wait().await;
        stderr.wait().await;
        debug!(%build, "output streams drained");
        self.finalize(build).await;
    }

    /// Cancel the active build and wait for its teardown.
    pub async fn cancel(&self) -> Result<BuildId, SupervisorError> {
        let build = {
            let mut state = self.shared.state.lock();
            if state.active.is_none() {
                debug!("cancel rejected, no active build");
                return Err(SupervisorError::NoActiveBuild);
            }
            let now = self.shared.clock.epoch_ms();
            state.record.mark_cancelled(now);
            state.record.id()
        };
        info!(%build, "cancelling build");
        self.finalize(build).await;
        Ok(build)
    }

    /// Tear down `build`. Only the first call for a run does anything;
    /// returns whether this call performed the teardown.
    ///
    /// Order: disarm the kill switch, stop the drainers (output is final from
    /// here), resolve the done signals, have the reaper terminate the child if
    /// it is still alive, record its exit code, stamp the end time, clear the
    /// run.
    pub async fn finalize(&self, build: BuildId) -> bool {
        let reaper = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if state.record.id() != build || state.finalize_invoked {
                debug!(%build, "finalize already invoked, ignoring");
                return false;
            }
            let Some(active) = state.active.as_mut() else {
                debug!(%build, "no active process to finalize");
                return false;
            };
            state.finalize_invoked = true;

            active.tasks.kill_switch.cancel();
            active.tasks.stop_drain.cancel();
            active.tasks.terminate.cancel();
            state.capturing = false;
            let stdout_pending = active.tasks.stdout_done.resolve();
            let stderr_pending = active.tasks.stderr_done.resolve();
            info!(
                %build,
                pid = active.pid,
                drainers_pending = stdout_pending || stderr_pending,
                "finalizing build"
            );
            active.reaper.take()
        };

        // Spawned so teardown completes even if this caller is dropped.
        let teardown = tokio::spawn(self.clone().teardown(build, reaper));
        if let Err(e) = teardown.await {
            error!(%build, error = %e, "teardown task failed");
        }
        true
    }

    async fn teardown(self, build: BuildId, reaper: Option<JoinHandle<Option<i32>>>) {
        let exit_code = match reaper {
            Some(reaper) => reaper.await.unwrap_or_else(|e| {
                error!(%build, error = %e, "reaper task failed");
                None
            }),
            None => None,
        };

        {
            let mut state = self.shared.state.lock();
            if let Some(code) = exit_code {
                state.record.set_exit_code(code);
            }
            state.record.mark_ended(self.shared.clock.epoch_ms());
            state.active = None;
            state.in_flight = false;
            info!(
                %build,
                exit_code,
                phase = %state.record.phase(),
                timed_out = state.record.timed_out(),
                "build finalized"
            );
        }
        self.shared.idle.notify_waiters();
    }

    /// Flag `build` as timed out if it is still running and not yet being
    /// torn down.
    pub(crate) fn mark_timed_out(&self, build: BuildId) -> bool {
        let mut state = self.shared.state.lock();
        if state.record.id() != build || state.finalize_invoked {
            return false;
        }
        state.record.mark_timed_out()
    }

    fn capture(&self, build: BuildId, stream: Stream, bytes: &[u8]) -> bool {
        let mut state = self.shared.state.lock();
        if state.record.id() != build || !state.capturing {
            return false;
        }
        state.record.append(stream, bytes)
    }

    /// Snapshot of the current build record.
    pub fn status(&self) -> StatusReport {
        let state = self.shared.state.lock();
        StatusReport::from_record(&state.record, self.shared.clock.epoch_ms())
    }

    pub fn is_in_flight(&self) -> bool {
        self.shared.state.lock().in_flight
    }

    pub fn current_build(&self) -> BuildId {
        self.shared.state.lock().record.id()
    }

    /// Pid of the running child, if any.
    pub fn active_pid(&self) -> Option<u32> {
        self.shared.state.lock().active.as_ref().and_then(|a| a.pid)
    }

    /// Resolves once no build is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if !self.is_in_flight() {
                return;
            }
            notified.await;
        }
    }

    /// Cancel any active build and wait until teardown has finished.
    pub async fn shutdown(&self) {
        if let Ok(build) = self.cancel().await {
            info!(%build, "cancelled build for shutdown");
        }
        self.wait_idle().await;
    }
}

/// Routes a drainer's output into one run's record.
struct RunSink<C: Clock> {
    supervisor: Supervisor<C>,
    build: BuildId,
}

impl<C: Clock> OutputSink for RunSink<C> {
    fn capture(&self, stream: Stream, bytes: &[u8]) -> bool {
        self.supervisor.capture(self.build, stream, bytes)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
