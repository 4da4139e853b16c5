// src/engine/core.rs

//! Pure core run state machine.
//!
//! `RunCore` decides which tasks to dispatch and records their outcomes. It
//! has no channels, no Tokio types, and does not perform any IO; the async
//! shell in [`crate::engine::runtime`] feeds it completions and executes the
//! dispatch decisions.

use tracing::{info, warn};

use crate::dag::{DagGraph, ExecutionPlan, TaskId};
use crate::engine::report::RunReport;
use crate::engine::state::StateTable;
use crate::errors::{ActionError, SchedulerError};
use crate::types::TaskState;

/// A task whose own action failed.
#[derive(Debug)]
struct Failure {
    task: TaskId,
    error: ActionError,
    /// Dependents failed without running because of this failure.
    dependents: Vec<TaskId>,
}

#[derive(Debug)]
pub struct RunCore<'g> {
    graph: &'g DagGraph,
    plan: ExecutionPlan,
    states: StateTable,
    jobs: usize,
    /// Set on the first failure or on cancellation: nothing new is dispatched.
    halted: bool,
    cancelled: bool,
    started: Vec<TaskId>,
    failures: Vec<Failure>,
}

impl<'g> RunCore<'g> {
    pub fn new(graph: &'g DagGraph, plan: ExecutionPlan, jobs: usize) -> Self {
        let states = StateTable::for_plan(&plan);
        Self {
            graph,
            plan,
            states,
            jobs: jobs.max(1),
            halted: false,
            cancelled: false,
            started: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn graph(&self) -> &'g DagGraph {
        self.graph
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Tasks to dispatch now, already marked `Running`.
    pub fn next_ready(&mut self) -> Vec<TaskId> {
        if self.halted {
            return Vec::new();
        }

        let free = self.jobs.saturating_sub(self.states.running_count());
        if free == 0 {
            return Vec::new();
        }

        let ready = self
            .states
            .collect_ready(self.graph, self.plan.order(), free);

        for id in ready.iter() {
            info!(task = %self.graph.name(*id), "starting task");
        }
        self.started.extend(ready.iter().copied());
        ready
    }

    /// Record the outcome reported by a dispatched task.
    pub fn complete(&mut self, id: TaskId, result: Result<(), ActionError>) {
        let name = self.graph.name(id);
        match result {
            Ok(()) => {
                info!(task = %name, "task done");
                self.states.mark_done(id);
            }
            Err(error) => {
                warn!(task = %name, error = %error, "task failed; skipping its dependents");
                self.states.mark_failed(id);
                let mut dependents = self.states.mark_dependents_failed(self.graph, id);
                dependents.sort_by_key(|d| self.plan.position(*d));
                self.halted = true;
                self.failures.push(Failure {
                    task: id,
                    error,
                    dependents,
                });
            }
        }
    }

    /// Stop dispatching. Tasks already running are left to finish.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            warn!(
                running = self.states.running_count(),
                "run cancelled; no further tasks will be started"
            );
        }
        self.cancelled = true;
        self.halted = true;
    }

    /// Build the final report and decide the run's result.
    ///
    /// When several independent tasks failed, the one earliest in resolution
    /// order is reported as the root cause; the others show up as `Failed` in
    /// the report.
    pub fn finish(self) -> Result<RunReport, SchedulerError> {
        let graph = self.graph;

        let states = self
            .plan
            .order()
            .iter()
            .map(|id| {
                let state = self.states.state(*id).unwrap_or(TaskState::Pending);
                (graph.name(*id).to_string(), state)
            })
            .collect::<Vec<_>>();

        let skipped = self
            .plan
            .order()
            .iter()
            .filter(|id| !self.started.contains(id))
            .map(|id| graph.name(*id).to_string())
            .collect();

        let report = RunReport {
            ran: graph.names_of(&self.started),
            skipped,
            states,
        };

        let plan = &self.plan;
        let root = self
            .failures
            .into_iter()
            .min_by_key(|f| plan.position(f.task));

        if let Some(failure) = root {
            return Err(SchedulerError::TaskFailed {
                task: graph.name(failure.task).to_string(),
                source: failure.error,
                dependents: graph.names_of(&failure.dependents),
                report: Box::new(report),
            });
        }

        if self.cancelled && !self.states.all_terminal() {
            return Err(SchedulerError::Cancelled {
                report: Box::new(report),
            });
        }

        Ok(report)
    }
}
