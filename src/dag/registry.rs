// src/dag/registry.rs

//! Named task registration.

use std::collections::HashMap;

use tracing::debug;

use crate::dag::graph::{DagGraph, TaskId};
use crate::errors::SchedulerError;
use crate::exec::Action;
use crate::types::TaskName;

/// Everything needed to register one task.
///
/// ```
/// use makedag::dag::TaskSpec;
/// use makedag::exec::Action;
///
/// let spec = TaskSpec::new("build")
///     .after(["clean"])
///     .description("Build the library")
///     .action(Action::noop());
/// assert_eq!(spec.name(), "build");
/// ```
#[derive(Debug, Clone)]
pub struct TaskSpec {
    name: TaskName,
    prerequisites: Vec<TaskName>,
    action: Action,
    description: Option<String>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            prerequisites: Vec::new(),
            action: Action::noop(),
            description: None,
        }
    }

    /// Append prerequisites; order is preserved.
    pub fn after<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.prerequisites
            .extend(prerequisites.into_iter().map(Into::into));
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registered task payload.
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub action: Action,
    pub description: Option<String>,
}

/// Registry of named tasks.
///
/// Prerequisites are interned into [`TaskId`]s as soon as a task is
/// registered. A prerequisite that is not registered yet gets a placeholder
/// node; whether it was ever filled in is only checked when a run resolves
/// its closure, so tasks may be registered in any order.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    graph: DagGraph,
    defs: HashMap<TaskId, TaskDef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Re-registering a name is rejected and leaves the existing
    /// registration untouched.
    pub fn register(&mut self, spec: TaskSpec) -> Result<TaskId, SchedulerError> {
        if self.lookup(&spec.name).is_some() {
            return Err(SchedulerError::DuplicateTask(spec.name));
        }

        let id = self.graph.intern(&spec.name);
        let prerequisites = spec
            .prerequisites
            .iter()
            .map(|name| self.graph.intern(name))
            .collect::<Vec<_>>();

        debug!(
            task = %spec.name,
            prerequisites = ?spec.prerequisites,
            action = spec.action.kind(),
            "registered task"
        );

        self.graph.define(id, prerequisites);
        self.defs.insert(
            id,
            TaskDef {
                action: spec.action,
                description: spec.description,
            },
        );

        Ok(id)
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Handle for a registered task (placeholders are not returned).
    pub fn lookup(&self, name: &str) -> Option<TaskId> {
        self.graph
            .lookup(name)
            .filter(|id| self.graph.is_defined(*id))
    }

    pub fn def(&self, id: TaskId) -> Option<&TaskDef> {
        self.defs.get(&id)
    }

    pub fn description_of(&self, name: &str) -> Option<&str> {
        let id = self.lookup(name)?;
        self.defs.get(&id)?.description.as_deref()
    }

    /// Names of the declared prerequisites of `name`, in declaration order.
    pub fn prerequisites_of(&self, name: &str) -> Option<Vec<TaskName>> {
        let id = self.lookup(name)?;
        Some(self.graph.names_of(self.graph.prerequisites_of(id)))
    }

    /// Registered task names, in order of first mention.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph
            .ids()
            .filter(|id| self.graph.is_defined(*id))
            .map(|id| self.graph.name(id))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_references_become_placeholders() {
        let mut reg = TaskRegistry::new();
        reg.register(TaskSpec::new("build").after(["clean"])).unwrap();

        assert!(reg.lookup("build").is_some());
        assert!(reg.lookup("clean").is_none());
        assert_eq!(reg.task_names().collect::<Vec<_>>(), vec!["build"]);

        reg.register(TaskSpec::new("clean")).unwrap();
        assert!(reg.lookup("clean").is_some());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn duplicate_is_rejected_and_original_kept() {
        let mut reg = TaskRegistry::new();
        reg.register(TaskSpec::new("a").description("first")).unwrap();

        let err = reg
            .register(TaskSpec::new("a").after(["b"]).description("second"))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateTask(ref n) if n == "a"));

        assert_eq!(reg.description_of("a"), Some("first"));
        assert_eq!(reg.prerequisites_of("a"), Some(vec![]));
        assert!(reg.graph().lookup("b").is_none());
    }
}
