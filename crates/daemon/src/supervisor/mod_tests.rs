// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bsup_core::{FakeClock, Phase, StreamText};
use nix::errno::Errno;
use nix::unistd::Pid;

const SETTLE: Duration = Duration::from_secs(10);

fn config() -> SupervisorConfig {
    SupervisorConfig { kill_grace: Duration::from_secs(2), pacing: DrainPacing::default() }
}

fn supervisor() -> Supervisor {
    Supervisor::new(config())
}

fn spec(command: &str) -> BuildSpec {
    BuildSpec::new(command, Duration::from_secs(60))
}

async fn settle<C: Clock>(supervisor: &Supervisor<C>) {
    tokio::time::timeout(SETTLE, supervisor.wait_idle())
        .await
        .expect("build did not finish in time");
}

fn text(stream: &StreamText) -> &str {
    stream.text().expect("stream should decode")
}

fn assert_reaped(pid: u32) {
    let result = nix::sys::signal::kill(Pid::from_raw(pid as i32), None);
    assert_eq!(result, Err(Errno::ESRCH), "pid {pid} should be gone");
}

#[tokio::test]
async fn immediate_exit_finishes_with_zero() {
    let sup = supervisor();
    let build = sup.start(&spec("true")).unwrap();
    assert_eq!(build, BuildId(1));
    settle(&sup).await;

    let report = sup.status();
    assert_eq!(report.build, build);
    assert_eq!(report.phase, Phase::Finished);
    assert_eq!(report.exit_code, Some(0));
    assert!(!report.timed_out);
    assert!(report.stdout.is_empty());
    assert!(report.stderr.is_empty());
    assert!(report.started_at_ms.is_some());
    assert!(report.ended_at_ms.is_some());
    assert_eq!(sup.active_pid(), None);
}

#[tokio::test]
async fn build_finishes_when_child_exits_before_its_pipes_close() {
    let sup = supervisor();
    sup.start(&spec("sh -c 'sleep 5 & echo done'")).unwrap();

    // The backgrounded sleep keeps both pipes open for five seconds.
    tokio::time::timeout(Duration::from_secs(3), sup.wait_idle())
        .await
        .expect("build should finish when its child exits");

    let report = sup.status();
    assert_eq!(report.phase, Phase::Finished);
    assert_eq!(report.exit_code, Some(0));
    assert!(!report.timed_out);
    assert_eq!(text(&report.stdout), "done\n");
    assert!(!sup.is_in_flight());
}

#[tokio::test]
async fn exit_code_is_reported_verbatim() {
    let sup = supervisor();
    sup.start(&spec("sh -c 'exit 3'")).unwrap();
    settle(&sup).await;
    assert_eq!(sup.status().exit_code, Some(3));
}

#[tokio::test]
async fn output_is_captured_per_stream() {
    let sup = supervisor();
    sup.start(&spec("sh -c 'printf out1; printf err1 >&2; printf out2'")).unwrap();
    settle(&sup).await;

    let report = sup.status();
    assert_eq!(text(&report.stdout), "out1out2");
    assert_eq!(text(&report.stderr), "err1");
}

#[tokio::test]
async fn large_output_is_captured_in_order() {
    let sup = supervisor();
    sup.start(&spec("sh -c 'i=0; while [ $i -lt 3000 ]; do echo line-$i; i=$((i+1)); done'"))
        .unwrap();
    settle(&sup).await;

    let expected: String = (0..3000).map(|i| format!("line-{i}\n")).collect();
    let report = sup.status();
    assert_eq!(report.exit_code, Some(0));
    assert_eq!(text(&report.stdout), expected);
}

#[tokio::test]
async fn output_is_visible_while_running() {
    let sup = supervisor();
    sup.start(&spec("sh -c 'echo started; exec sleep 30'")).unwrap();

    let mut seen = false;
    for _ in 0..200 {
        let report = sup.status();
        if report.stdout.text() == Some("started\n") {
            assert_eq!(report.phase, Phase::Running);
            assert!(report.ended_at_ms.is_none());
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(seen, "partial output never appeared");
    sup.cancel().await.unwrap();
}

#[tokio::test]
async fn start_while_running_is_rejected() {
    let sup = supervisor();
    let build = sup.start(&spec("sleep 30")).unwrap();
    let pid = sup.active_pid();

    let err = sup.start(&spec("true")).unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyRunning));
    assert_eq!(sup.current_build(), build);
    assert_eq!(sup.active_pid(), pid);
    assert_eq!(sup.status().phase, Phase::Running);

    sup.cancel().await.unwrap();
}

#[tokio::test]
async fn cancel_without_build_leaves_state_unchanged() {
    let sup = supervisor();
    let before = sup.status();
    assert!(matches!(sup.cancel().await, Err(SupervisorError::NoActiveBuild)));
    assert_eq!(sup.status(), before);
    assert_eq!(before.phase, Phase::Ready);
}

#[tokio::test]
async fn cancel_after_finish_leaves_state_unchanged() {
    let sup = supervisor();
    sup.start(&spec("sh -c 'echo done'")).unwrap();
    settle(&sup).await;

    let before = sup.status();
    assert!(matches!(sup.cancel().await, Err(SupervisorError::NoActiveBuild)));
    assert_eq!(sup.status(), before);
    assert_eq!(before.phase, Phase::Finished);
}

#[tokio::test]
async fn cancel_terminates_running_build() {
    let sup = supervisor();
    let build = sup.start(&spec("sleep 30")).unwrap();
    let pid = sup.active_pid().expect("child pid");

    assert_eq!(sup.cancel().await.unwrap(), build);

    let report = sup.status();
    assert_eq!(report.phase, Phase::Cancelled);
    assert!(report.cancelled_at_ms.is_some());
    assert!(report.ended_at_ms.is_some());
    assert_eq!(report.exit_code, None);
    assert!(!sup.is_in_flight());
    assert_reaped(pid);
}

#[tokio::test]
async fn cancel_timestamps_come_from_clock() {
    let clock = FakeClock::new();
    let sup = Supervisor::with_clock(clock.clone(), config());
    sup.start(&spec("sleep 30")).unwrap();
    clock.advance(Duration::from_secs(5));

    sup.cancel().await.unwrap();

    let report = sup.status();
    assert_eq!(report.started_at_ms, Some(1_000_000));
    assert_eq!(report.cancelled_at_ms, Some(1_005_000));
    assert_eq!(report.ended_at_ms, Some(1_005_000));
    assert_eq!(report.duration_ms, Some(5_000));
}

#[tokio::test]
async fn timeout_terminates_build() {
    let sup = supervisor();
    sup.start(&BuildSpec::new("sh -c 'echo begun; exec sleep 30'", Duration::from_millis(200)))
        .unwrap();
    let pid = sup.active_pid().expect("child pid");
    settle(&sup).await;

    let report = sup.status();
    assert!(report.timed_out);
    assert_eq!(report.phase, Phase::Finished);
    assert_eq!(report.exit_code, None);
    assert_eq!(text(&report.stdout), "begun\n");
    assert_reaped(pid);
}

#[tokio::test]
async fn term_ignoring_build_is_killed_after_grace() {
    let sup = Supervisor::new(SupervisorConfig {
        kill_grace: Duration::from_millis(200),
        pacing: DrainPacing::default(),
    });
    sup.start(&spec("sh -c \"trap '' TERM; exec sleep 30\"")).unwrap();
    let pid = sup.active_pid().expect("child pid");
    // Let the shell install its trap before signalling.
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(SETTLE, sup.cancel()).await.unwrap().unwrap();
    assert_eq!(sup.status().phase, Phase::Cancelled);
    assert_reaped(pid);
}

#[tokio::test]
async fn finish_before_timeout_is_not_flagged() {
    let sup = supervisor();
    sup.start(&BuildSpec::new("true", Duration::from_millis(300))).unwrap();
    settle(&sup).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let report = sup.status();
    assert!(!report.timed_out);
    assert_eq!(report.phase, Phase::Finished);
}

#[tokio::test]
async fn concurrent_finalize_runs_once() {
    let sup = supervisor();
    let build = sup.start(&spec("sleep 30")).unwrap();

    let (a, b, c) = tokio::join!(sup.finalize(build), sup.finalize(build), sup.finalize(build));
    assert_eq!([a, b, c].iter().filter(|ran| **ran).count(), 1);
    assert!(!sup.finalize(build).await);

    let report = sup.status();
    assert_eq!(report.phase, Phase::Finished);
    assert!(report.ended_at_ms.is_some());
    assert!(!sup.is_in_flight());
}

#[tokio::test]
async fn stale_finalize_does_not_touch_newer_build() {
    let sup = supervisor();
    let first = sup.start(&spec("true")).unwrap();
    settle(&sup).await;

    let second = sup.start(&spec("sleep 30")).unwrap();
    assert_eq!(second, first.next());
    assert!(!sup.finalize(first).await);
    assert!(!sup.mark_timed_out(first));
    assert!(sup.is_in_flight());
    assert_eq!(sup.status().phase, Phase::Running);

    sup.cancel().await.unwrap();
}

#[tokio::test]
async fn restart_discards_previous_record() {
    let sup = supervisor();
    sup.start(&spec("echo first")).unwrap();
    settle(&sup).await;
    assert_eq!(text(&sup.status().stdout), "first\n");

    let second = sup.start(&spec("echo second")).unwrap();
    settle(&sup).await;
    let report = sup.status();
    assert_eq!(report.build, second);
    assert_eq!(text(&report.stdout), "second\n");
}

#[tokio::test]
async fn invalid_command_is_rejected_without_state_change() {
    let sup = supervisor();
    let err = sup.start(&spec("echo 'unterminated")).unwrap_err();
    assert!(matches!(err, SupervisorError::InvalidCommand(_)));
    assert!(!sup.is_in_flight());
    assert_eq!(sup.status().phase, Phase::Ready);
    assert_eq!(sup.current_build(), BuildId::default());
}

#[tokio::test]
async fn empty_command_is_rejected() {
    let sup = supervisor();
    let err = sup.start(&spec("   ")).unwrap_err();
    assert!(matches!(err, SupervisorError::EmptyCommand));
    assert!(!sup.is_in_flight());
}

#[tokio::test]
async fn spawn_failure_clears_in_flight() {
    let sup = supervisor();
    let err = sup.start(&spec("/nonexistent/bsup-build-tool --flag")).unwrap_err();
    match err {
        SupervisorError::SpawnError { program, .. } => {
            assert_eq!(program, "/nonexistent/bsup-build-tool")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!sup.is_in_flight());
    assert_eq!(sup.active_pid(), None);

    sup.start(&spec("true")).unwrap();
    settle(&sup).await;
    assert_eq!(sup.status().exit_code, Some(0));
}

#[tokio::test]
async fn shutdown_cancels_and_waits() {
    let sup = supervisor();
    sup.start(&spec("sleep 30")).unwrap();
    let pid = sup.active_pid().expect("child pid");

    tokio::time::timeout(SETTLE, sup.shutdown()).await.unwrap();
    assert!(!sup.is_in_flight());
    assert_eq!(sup.status().phase, Phase::Cancelled);
    assert_reaped(pid);
}

#[tokio::test]
async fn shutdown_when_idle_returns() {
    let sup = supervisor();
    tokio::time::timeout(SETTLE, sup.shutdown()).await.unwrap();
    assert_eq!(sup.status().phase, Phase::Ready);
}

#[tokio::test]
async fn start_and_cancel_sequence_keeps_single_build() {
    let sup = supervisor();
    for round in 0..6 {
        let was_in_flight = sup.is_in_flight();
        let started = sup.start(&spec("sleep 30"));
        assert_eq!(started.is_err(), was_in_flight, "round {round}");

        let again = sup.start(&spec("sleep 30"));
        assert!(matches!(again, Err(SupervisorError::AlreadyRunning)));

        if round % 2 == 0 {
            sup.cancel().await.unwrap();
            assert!(!sup.is_in_flight());
        }
        assert!(sup.active_pid().is_none() || sup.is_in_flight());
    }
    sup.shutdown().await;
}

#[tokio::test]
async fn kill_switch_disarmed_before_deadline() {
    let sup = supervisor();
    let disarm = CancellationToken::new();
    disarm.cancel();
    let exit = kill_switch::run(sup, BuildId(1), Duration::from_secs(60), disarm).await;
    assert_eq!(exit, kill_switch::KillSwitchExit::Disarmed);
}

#[tokio::test]
async fn kill_switch_idle_without_running_build() {
    let sup = supervisor();
    let exit =
        kill_switch::run(sup.clone(), BuildId(1), Duration::from_millis(10), CancellationToken::new())
            .await;
    assert_eq!(exit, kill_switch::KillSwitchExit::Idle);
    assert!(!sup.status().timed_out);
}
