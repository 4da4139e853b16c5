// tests/failure_propagation.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{init_tracing, spied, with_timeout, ConfigFileBuilder, Spy, TaskConfigBuilder};
use makedag::dag::{Scheduler, TaskSpec};
use makedag::engine::RunOptions;
use makedag::errors::{ActionError, SchedulerError};
use makedag::exec::{Action, Placeholders, StepEnv};
use makedag::fs::RealFileSystem;
use makedag::types::TaskState;
use tokio::sync::oneshot;

#[tokio::test]
async fn failing_prerequisite_blocks_dependents_and_is_named() {
    init_tracing();
    let spy = Spy::new();
    let mut s = Scheduler::new();
    spied(&mut s, &spy, "clean", &[]);
    s.register(
        TaskSpec::new("build")
            .after(["clean"])
            .action(spy.failing("build", "compiler exploded")),
    )
    .unwrap();
    spied(&mut s, &spy, "test", &["build"]);
    spied(&mut s, &spy, "package", &["test"]);

    let err = with_timeout(s.run("package")).await.unwrap_err();

    assert_eq!(spy.calls(), vec!["clean", "build"]);
    assert_eq!(spy.count("test"), 0);
    assert_eq!(spy.count("package"), 0);

    match &err {
        SchedulerError::TaskFailed {
            task,
            source,
            dependents,
            report,
        } => {
            assert_eq!(task, "build");
            assert!(source.to_string().contains("compiler exploded"));
            assert_eq!(dependents, &vec!["test", "package"]);
            assert_eq!(report.ran, vec!["clean", "build"]);
            assert_eq!(report.skipped, vec!["test", "package"]);
            assert_eq!(report.state_of("clean"), Some(TaskState::Done));
            assert_eq!(report.state_of("build"), Some(TaskState::Failed));
            assert_eq!(report.state_of("package"), Some(TaskState::Failed));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    assert!(err.to_string().contains("task 'build' failed"));
}

// With one job, tasks start in resolution order, so `bad` runs before
// `independent`.
#[tokio::test]
async fn single_job_failure_halts_dispatch_of_independent_tasks() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("bad").action(spy.failing("bad", "nope")))
        .unwrap();
    spied(&mut s, &spy, "independent", &[]);
    spied(&mut s, &spy, "all", &["bad", "independent"]);

    let err = with_timeout(s.run("all")).await.unwrap_err();

    assert_eq!(spy.calls(), vec!["bad"]);
    let report = err.report().expect("run errors carry a report");
    assert_eq!(report.skipped, vec!["independent", "all"]);
    assert_eq!(report.state_of("independent"), Some(TaskState::Pending));
    assert!(report.summary().contains("failed: bad"));
}

#[tokio::test]
async fn completion_signal_failure_propagates() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    s.register(
        TaskSpec::new("upload").action(spy.delayed_failing("upload", 20, "connection reset")),
    )
    .unwrap();
    spied(&mut s, &spy, "notify", &["upload"]);

    let err = with_timeout(s.run("notify")).await.unwrap_err();

    assert!(matches!(
        err,
        SchedulerError::TaskFailed { ref task, source: ActionError::Failed(_), .. } if task == "upload"
    ));
    assert_eq!(spy.count("notify"), 0);
}

#[tokio::test]
async fn dropped_completion_signal_is_a_failure() {
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("forgetful").action(Action::with_completion(|_, done| {
        drop(done);
    })))
    .unwrap();

    let err = with_timeout(s.run("forgetful")).await.unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::TaskFailed { source: ActionError::SignalDropped, .. }
    ));
}

#[tokio::test]
async fn silent_action_times_out() {
    let mut s = Scheduler::with_options(RunOptions {
        task_timeout: Some(Duration::from_millis(50)),
        ..RunOptions::default()
    });
    s.register(TaskSpec::new("hang").action(Action::with_completion(|_, done| {
        // Keep the signal alive without ever firing it.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            done.done();
        });
    })))
    .unwrap();

    let err = with_timeout(s.run("hang")).await.unwrap_err();
    match err {
        SchedulerError::TaskFailed {
            task,
            source: ActionError::TimedOut(limit),
            ..
        } => {
            assert_eq!(task, "hang");
            assert_eq!(limit, Duration::from_millis(50));
        }
        other => panic!("expected timeout failure, got {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn timed_out_command_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ConfigFileBuilder::new()
        .task_timeout("200ms")
        .with_task(
            "slow",
            TaskConfigBuilder::new().cmd("sleep 1; touch late.txt").build(),
        )
        .build();
    let env = StepEnv::new(dir.path(), Arc::new(RealFileSystem), Placeholders::new());
    let s = Scheduler::from_config(&cfg, &env, cfg.run_options()).unwrap();

    let err = with_timeout(s.run("slow")).await.unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::TaskFailed { ref task, source: ActionError::TimedOut(_), .. } if task == "slow"
    ));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(
        !dir.path().join("late.txt").exists(),
        "command kept running after its task timed out"
    );
}

#[tokio::test]
async fn panicking_action_is_a_failure() {
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("boom").action(Action::sync(|_| panic!("kaboom"))))
        .unwrap();

    let err = with_timeout(s.run("boom")).await.unwrap_err();
    match err {
        SchedulerError::TaskFailed {
            source: ActionError::Panicked(msg),
            ..
        } => assert!(msg.contains("kaboom")),
        other => panic!("expected panic failure, got {other:?}"),
    }
}

#[tokio::test]
async fn earliest_failure_in_resolution_order_is_the_root_cause() {
    let spy = Spy::new();
    let mut s = Scheduler::with_options(RunOptions {
        jobs: 2,
        ..RunOptions::default()
    });
    // "first" resolves before "second", but fails later.
    s.register(TaskSpec::new("first").action(spy.delayed_failing("first", 60, "late")))
        .unwrap();
    s.register(TaskSpec::new("second").action(spy.delayed_failing("second", 5, "early")))
        .unwrap();
    spied(&mut s, &spy, "all", &["first", "second"]);

    let err = with_timeout(s.run("all")).await.unwrap_err();

    match err {
        SchedulerError::TaskFailed { task, report, .. } => {
            assert_eq!(task, "first");
            assert_eq!(report.state_of("second"), Some(TaskState::Failed));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_dispatch_after_running_task() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("slow").action(spy.delayed("slow", 100)))
        .unwrap();
    spied(&mut s, &spy, "after", &["slow"]);

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = tx.send(());
    });

    let err = with_timeout(s.run_with_cancel(&["after"], rx)).await.unwrap_err();

    match err {
        SchedulerError::Cancelled { report } => {
            assert_eq!(report.state_of("slow"), Some(TaskState::Done));
            assert_eq!(report.state_of("after"), Some(TaskState::Pending));
            assert_eq!(report.skipped, vec!["after"]);
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert_eq!(spy.completions(), vec!["slow"]);
    assert_eq!(spy.count("after"), 0);
}

#[tokio::test]
async fn dropped_cancel_sender_does_not_cancel() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    spied(&mut s, &spy, "a", &[]);
    spied(&mut s, &spy, "b", &["a"]);

    let (tx, rx) = oneshot::channel::<()>();
    drop(tx);

    with_timeout(s.run_with_cancel(&["b"], rx)).await.unwrap();
    assert_eq!(spy.calls(), vec!["a", "b"]);
}
