// src/dag/resolve.rs

//! Closure resolution: which tasks a run needs, and in what order.
//!
//! Depth-first traversal over prerequisite edges with the usual three-colour
//! marking. A node is GRAY while its prerequisites are being explored, so
//! reaching a GRAY node again means the graph loops back on itself.

use std::collections::HashMap;

use crate::dag::graph::{DagGraph, TaskId};
use crate::errors::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// The ordered closure of one run.
///
/// `order` lists every task exactly once, each after all of its
/// prerequisites (depth-first post-order, prerequisites visited in
/// declaration order).
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    order: Vec<TaskId>,
    position: HashMap<TaskId, usize>,
}

impl ExecutionPlan {
    fn new(order: Vec<TaskId>) -> Self {
        let position = order
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
        Self { order, position }
    }

    pub fn order(&self) -> &[TaskId] {
        &self.order
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.position.contains_key(&id)
    }

    /// Index of `id` in the execution order.
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.position.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolve the closure of `roots`.
///
/// Fails before anything runs if the closure reaches a name that was never
/// registered, or contains a cycle.
pub fn resolve(graph: &DagGraph, roots: &[TaskId]) -> Result<ExecutionPlan, SchedulerError> {
    let mut color = vec![Color::White; graph.len()];
    let mut order = Vec::new();

    for &root in roots {
        if color[root.index()] != Color::White {
            continue;
        }
        if !graph.is_defined(root) {
            return Err(SchedulerError::UnknownTask(graph.name(root).to_string()));
        }

        // Each frame is (node, index of the next prerequisite to visit).
        let mut stack: Vec<(TaskId, usize)> = vec![(root, 0)];
        color[root.index()] = Color::Gray;

        while let Some(frame) = stack.last_mut() {
            let (id, next) = *frame;
            let prerequisites = graph.prerequisites_of(id);

            if next == prerequisites.len() {
                color[id.index()] = Color::Black;
                order.push(id);
                stack.pop();
                continue;
            }

            frame.1 += 1;
            let dep = prerequisites[next];

            if !graph.is_defined(dep) {
                return Err(SchedulerError::InvalidReference {
                    task: graph.name(id).to_string(),
                    missing: graph.name(dep).to_string(),
                });
            }

            match color[dep.index()] {
                Color::White => {
                    color[dep.index()] = Color::Gray;
                    stack.push((dep, 0));
                }
                Color::Gray => {
                    let start = stack
                        .iter()
                        .position(|(node, _)| *node == dep)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..]
                        .iter()
                        .map(|(node, _)| graph.name(*node).to_string())
                        .collect();
                    cycle.push(graph.name(dep).to_string());
                    return Err(SchedulerError::CyclicDependency { cycle });
                }
                Color::Black => {}
            }
        }
    }

    Ok(ExecutionPlan::new(order))
}

/// Check every registered task at once.
pub fn validate_all(graph: &DagGraph) -> Result<(), SchedulerError> {
    let roots = graph
        .ids()
        .filter(|id| graph.is_defined(*id))
        .collect::<Vec<_>>();
    resolve(graph, &roots).map(|_| ())
}
