// tests/registration.rs

mod common;

use common::{spied, with_timeout, Spy};
use makedag::dag::{Scheduler, TaskSpec};
use makedag::errors::SchedulerError;

#[tokio::test]
async fn duplicate_registration_is_rejected_and_original_kept() {
    let original = Spy::new();
    let impostor = Spy::new();
    let mut s = Scheduler::new();

    let id = s
        .register(
            TaskSpec::new("build")
                .description("the real build")
                .action(original.action("build")),
        )
        .unwrap();

    let err = s
        .register(
            TaskSpec::new("build")
                .after(["something"])
                .description("second attempt")
                .action(impostor.action("build")),
        )
        .unwrap_err();

    assert!(matches!(err, SchedulerError::DuplicateTask(ref name) if name == "build"));
    assert_eq!(err.to_string(), "task 'build' is already registered");

    assert_eq!(s.registry().lookup("build"), Some(id));
    assert_eq!(s.describe("build"), Some("the real build"));
    assert_eq!(s.prerequisites_of("build"), Some(vec![]));

    with_timeout(s.run("build")).await.unwrap();
    assert_eq!(original.count("build"), 1);
    assert_eq!(impostor.count("build"), 0);
}

#[test]
fn registering_a_referenced_name_fills_its_placeholder() {
    let spy = Spy::new();
    let mut s = Scheduler::new();
    spied(&mut s, &spy, "app", &["lib"]);
    assert_eq!(s.task_names().collect::<Vec<_>>(), vec!["app"]);

    let lib = s.register(TaskSpec::new("lib").action(spy.action("lib"))).unwrap();
    assert_eq!(s.registry().lookup("lib"), Some(lib));
    assert_eq!(s.task_names().collect::<Vec<_>>(), vec!["app", "lib"]);

    assert!(matches!(
        s.register(TaskSpec::new("lib")),
        Err(SchedulerError::DuplicateTask(_))
    ));
}

#[test]
fn queries_on_unknown_names_return_none() {
    let s = Scheduler::new();
    assert_eq!(s.describe("ghost"), None);
    assert_eq!(s.prerequisites_of("ghost"), None);
    assert!(matches!(
        s.plan(&["ghost"]),
        Err(SchedulerError::UnknownTask(_))
    ));
}
