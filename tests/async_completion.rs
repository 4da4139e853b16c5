// tests/async_completion.rs

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{init_tracing, spied, with_timeout, Spy};
use makedag::dag::{Scheduler, TaskSpec};
use makedag::engine::RunOptions;
use makedag::exec::Action;

#[tokio::test]
async fn delayed_prerequisite_gates_its_dependent() {
    init_tracing();
    let spy = Spy::new();
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("fetch").action(spy.delayed("fetch", 50)))
        .unwrap();
    spied(&mut s, &spy, "unpack", &["fetch"]);

    with_timeout(s.run("unpack")).await.unwrap();

    let fetch_done = spy.completed_at("fetch").expect("fetch completed");
    let unpack_start = spy.started_at("unpack").expect("unpack started");
    assert!(unpack_start >= fetch_done);
    assert!(
        unpack_start.duration_since(spy.started_at("fetch").unwrap()) >= Duration::from_millis(50)
    );
}

#[tokio::test]
async fn completion_signal_may_fire_from_another_thread() {
    let fired_on = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&fired_on);

    let mut s = Scheduler::new();
    s.register(TaskSpec::new("thread").action(Action::with_completion(move |ctx, done| {
        let seen = Arc::clone(&seen);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            *seen.lock().unwrap() = Some(ctx.name().to_string());
            done.done();
        });
    })))
    .unwrap();

    with_timeout(s.run("thread")).await.unwrap();
    assert_eq!(fired_on.lock().unwrap().as_deref(), Some("thread"));
}

#[tokio::test]
async fn future_actions_are_awaited() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("sleepy").action(Action::future(|_| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<(), anyhow::Error>(())
    })))
    .unwrap();
    spied(&mut s, &spy, "next", &["sleepy"]);

    let report = with_timeout(s.run("next")).await.unwrap();
    assert_eq!(report.ran, vec!["sleepy", "next"]);
}

#[tokio::test]
async fn independent_tasks_overlap_when_jobs_allow() {
    let spy = Spy::new();
    let mut s = Scheduler::with_options(RunOptions {
        jobs: 2,
        ..RunOptions::default()
    });
    s.register(TaskSpec::new("left").action(spy.delayed("left", 80)))
        .unwrap();
    s.register(TaskSpec::new("right").action(spy.delayed("right", 80)))
        .unwrap();
    spied(&mut s, &spy, "join", &["left", "right"]);

    with_timeout(s.run("join")).await.unwrap();

    let right_start = spy.started_at("right").unwrap();
    let left_done = spy.completed_at("left").unwrap();
    assert!(right_start < left_done, "both prerequisites should be in flight together");

    let join_start = spy.started_at("join").unwrap();
    assert!(join_start >= left_done);
    assert!(join_start >= spy.completed_at("right").unwrap());
}

#[tokio::test]
async fn single_job_never_overlaps() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    s.register(TaskSpec::new("one").action(spy.delayed("one", 30)))
        .unwrap();
    s.register(TaskSpec::new("two").action(spy.delayed("two", 30)))
        .unwrap();
    spied(&mut s, &spy, "both", &["one", "two"]);

    with_timeout(s.run("both")).await.unwrap();

    let calls = spy.calls();
    let (first, second) = (&calls[0], &calls[1]);
    assert!(spy.started_at(second).unwrap() >= spy.completed_at(first).unwrap());
    assert_eq!(calls.last().map(String::as_str), Some("both"));
}
