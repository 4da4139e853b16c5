// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;

use crate::types::TaskName;

/// Typed handle for a task in a [`DagGraph`].
///
/// Names are resolved to handles once, at registration time; traversal and
/// per-run bookkeeping only ever deal in `TaskId`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Internal node structure: stores immediate prerequisites and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    name: TaskName,
    /// `false` while the node only exists because something listed it as a
    /// prerequisite before it was registered.
    defined: bool,
    /// Direct prerequisites, in declaration order.
    prerequisites: Vec<TaskId>,
    /// Direct dependents: tasks that list this one as a prerequisite.
    dependents: Vec<TaskId>,
}

/// Adjacency store keyed by [`TaskId`].
///
/// Unlike a validated config DAG, this graph may temporarily contain
/// placeholder nodes and even cycles; both are rejected when a run resolves
/// its closure (see [`crate::dag::resolve`]).
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: Vec<DagNode>,
    by_name: HashMap<TaskName, TaskId>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the handle for `name`, creating a placeholder node if needed.
    pub fn intern(&mut self, name: &str) -> TaskId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }

        let id = TaskId(self.nodes.len());
        self.nodes.push(DagNode {
            name: name.to_string(),
            defined: false,
            prerequisites: Vec::new(),
            dependents: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Turn a (possibly placeholder) node into a defined task with the given
    /// prerequisites. The caller is responsible for rejecting duplicates.
    pub fn define(&mut self, id: TaskId, prerequisites: Vec<TaskId>) {
        for dep in prerequisites.iter() {
            let dependents = &mut self.nodes[dep.0].dependents;
            if !dependents.contains(&id) {
                dependents.push(id);
            }
        }

        let node = &mut self.nodes[id.0];
        node.defined = true;
        node.prerequisites = prerequisites;
    }

    pub fn lookup(&self, name: &str) -> Option<TaskId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: TaskId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn is_defined(&self, id: TaskId) -> bool {
        self.nodes[id.0].defined
    }

    /// Number of nodes, placeholders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All handles, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..self.nodes.len()).map(TaskId)
    }

    /// Immediate prerequisites of a task, in declaration order.
    pub fn prerequisites_of(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id.0].prerequisites
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id.0].dependents
    }

    pub fn names_of(&self, ids: &[TaskId]) -> Vec<TaskName> {
        ids.iter().map(|id| self.name(*id).to_string()).collect()
    }
}
