#![allow(dead_code)]

pub use makedag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
pub use makedag_test_utils::{init_tracing, with_timeout, Spy};

use makedag::dag::{Scheduler, TaskSpec};

/// Register `name` with `prereqs`, using `spy.action(name)` as the action.
pub fn spied(scheduler: &mut Scheduler, spy: &Spy, name: &str, prereqs: &[&str]) {
    scheduler
        .register(
            TaskSpec::new(name)
                .after(prereqs.iter().copied())
                .action(spy.action(name)),
        )
        .expect("registration should succeed");
}
