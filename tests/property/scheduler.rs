use std::collections::{BTreeSet, HashSet};

use makedag::dag::{Scheduler, TaskSpec};
use makedag::engine::RunOptions;
use makedag::errors::SchedulerError;
use makedag::types::TaskState;
use makedag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use makedag_test_utils::Spy;
use proptest::prelude::*;

// Random DAGs: task N may only depend on tasks 0..N-1, which keeps them acyclic.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        deps.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{}", i)
}

/// Indices reachable from `target` through prerequisite edges, inclusive.
fn closure(deps: &[BTreeSet<usize>], target: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack = vec![target];
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(deps[i].iter().copied());
        }
    }
    seen
}

fn build(deps: &[BTreeSet<usize>], spy: &Spy, failing: Option<usize>, jobs: usize) -> Scheduler {
    let mut s = Scheduler::with_options(RunOptions {
        jobs,
        ..RunOptions::default()
    });
    // Register in reverse so most prerequisites start life as placeholders.
    for (i, prereqs) in deps.iter().enumerate().rev() {
        let action = if failing == Some(i) {
            spy.failing(&name(i), "injected")
        } else {
            spy.action(&name(i))
        };
        s.register(
            TaskSpec::new(name(i))
                .after(prereqs.iter().map(|d| name(*d)))
                .action(action),
        )
        .unwrap();
    }
    s
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn closure_runs_exactly_once_after_prerequisites(
        deps in dag_strategy(12),
        target_seed in any::<usize>(),
        jobs in 1..4usize,
    ) {
        let target = target_seed % deps.len();
        let spy = Spy::new();
        let s = build(&deps, &spy, None, jobs);

        let report = runtime().block_on(s.run(&name(target))).unwrap();

        let expected = closure(&deps, target);
        let calls = spy.calls();
        prop_assert_eq!(calls.len(), expected.len());
        for i in expected.iter() {
            prop_assert_eq!(spy.count(&name(*i)), 1);
        }

        for i in expected.iter() {
            let started = spy.started_at(&name(*i)).unwrap();
            for d in deps[*i].iter() {
                let done = spy.completed_at(&name(*d)).unwrap();
                prop_assert!(started >= done, "{} started before {} completed", name(*i), name(*d));
            }
        }
        prop_assert!(report.succeeded());
        prop_assert_eq!(report.states.len(), expected.len());
    }

    #[test]
    fn failure_never_lets_a_dependent_run(
        deps in dag_strategy(10),
        target_seed in any::<usize>(),
        failing_seed in any::<usize>(),
    ) {
        let target = target_seed % deps.len();
        let reachable: Vec<usize> = {
            let mut v: Vec<usize> = closure(&deps, target).into_iter().collect();
            v.sort_unstable();
            v
        };
        let failing = reachable[failing_seed % reachable.len()];

        let spy = Spy::new();
        let s = build(&deps, &spy, Some(failing), 1);

        let err = runtime().block_on(s.run(&name(target))).unwrap_err();

        let failed_name = name(failing);
        match err {
            SchedulerError::TaskFailed { ref task, ref report, .. } => {
                prop_assert_eq!(task, &failed_name);
                prop_assert_eq!(report.state_of(&name(target)), Some(TaskState::Failed));
            }
            ref other => prop_assert!(false, "expected TaskFailed, got {:?}", other),
        }

        // Nothing that (transitively) depends on the failing task was invoked.
        for i in reachable.iter() {
            if *i != failing && closure(&deps, *i).contains(&failing) {
                prop_assert_eq!(spy.count(&name(*i)), 0);
            }
        }
    }

    #[test]
    fn config_built_schedulers_plan_the_same_closure(
        deps in dag_strategy(10),
        target_seed in any::<usize>(),
    ) {
        let target = target_seed % deps.len();
        let mut builder = ConfigFileBuilder::new();
        for (i, prereqs) in deps.iter().enumerate() {
            let mut task = TaskConfigBuilder::new();
            for d in prereqs {
                task = task.after(&name(*d));
            }
            builder = builder.with_task(&name(i), task.build());
        }
        let cfg = builder.build();

        let env = makedag::exec::StepEnv::new(
            "/",
            std::sync::Arc::new(makedag::fs::MockFileSystem::new()),
            makedag::exec::Placeholders::new(),
        );
        let s = Scheduler::from_config(&cfg, &env, cfg.run_options()).unwrap();
        let plan = s.plan(&[name(target)]).unwrap();

        let expected: HashSet<String> = closure(&deps, target).into_iter().map(name).collect();
        let planned: HashSet<String> = plan.iter().cloned().collect();
        prop_assert_eq!(planned, expected);
        prop_assert_eq!(plan.last(), Some(&name(target)));
    }
}
