// src/engine/state.rs

//! Per-run state table for the tasks in a run's closure.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::dag::{DagGraph, ExecutionPlan, TaskId};
use crate::types::TaskState;

/// Task states for one run.
///
/// Only tasks in the run's closure have an entry. The table is written by the
/// run loop alone; workers report back through the runtime instead of
/// touching it.
#[derive(Debug, Clone)]
pub struct StateTable {
    states: HashMap<TaskId, TaskState>,
}

impl StateTable {
    pub fn for_plan(plan: &ExecutionPlan) -> Self {
        let states = plan
            .order()
            .iter()
            .map(|id| (*id, TaskState::Pending))
            .collect();
        Self { states }
    }

    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.states.get(&id).copied()
    }

    /// All prerequisites of `id` have reached `Done` in this run.
    pub fn deps_satisfied(&self, graph: &DagGraph, id: TaskId) -> bool {
        graph
            .prerequisites_of(id)
            .iter()
            .all(|dep| self.state(*dep) == Some(TaskState::Done))
    }

    /// Mark up to `limit` ready tasks as `Running` and return them, in
    /// execution order.
    pub fn collect_ready(&mut self, graph: &DagGraph, order: &[TaskId], limit: usize) -> Vec<TaskId> {
        let ready = order
            .iter()
            .copied()
            .filter(|id| {
                self.state(*id) == Some(TaskState::Pending) && self.deps_satisfied(graph, *id)
            })
            .take(limit)
            .collect::<Vec<_>>();

        for id in ready.iter() {
            debug!(task = %graph.name(*id), "prerequisites done; marking Running");
            self.states.insert(*id, TaskState::Running);
        }

        ready
    }

    pub fn mark_done(&mut self, id: TaskId) {
        self.states.insert(id, TaskState::Done);
    }

    pub fn mark_failed(&mut self, id: TaskId) {
        self.states.insert(id, TaskState::Failed);
    }

    /// Mark every pending transitive dependent of `failed` inside this run as
    /// `Failed`. Returns the newly failed tasks (not including `failed`).
    pub fn mark_dependents_failed(&mut self, graph: &DagGraph, failed: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = graph.dependents_of(failed).to_vec();
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut newly_failed = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            if self.state(id) == Some(TaskState::Pending) {
                debug!(
                    task = %graph.name(id),
                    upstream = %graph.name(failed),
                    "marking dependent Failed due to upstream failure"
                );
                self.states.insert(id, TaskState::Failed);
                newly_failed.push(id);
                stack.extend(graph.dependents_of(id).iter().copied());
            }
        }

        newly_failed
    }

    pub fn running_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == TaskState::Running)
            .count()
    }

    pub fn all_terminal(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }
}
