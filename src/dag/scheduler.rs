// src/dag/scheduler.rs

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::dag::registry::{TaskRegistry, TaskSpec};
use crate::dag::resolve::{resolve, validate_all, ExecutionPlan};
use crate::dag::TaskId;
use crate::engine::{execute, RunOptions, RunReport};
use crate::errors::SchedulerError;
use crate::exec::{build_task_action, StepEnv};
use crate::types::TaskName;

/// Task scheduler: owns the registry and runs tasks with their prerequisites.
///
/// The scheduler keeps no per-run state between invocations; every call to
/// one of the `run*` methods starts from a fresh state table.
#[derive(Debug, Default)]
pub struct Scheduler {
    registry: TaskRegistry,
    options: RunOptions,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RunOptions) -> Self {
        Self {
            registry: TaskRegistry::new(),
            options,
        }
    }

    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(
        cfg: &ConfigFile,
        env: &StepEnv,
        options: RunOptions,
    ) -> Result<Self, SchedulerError> {
        let mut scheduler = Self::with_options(options);

        for (name, tc) in cfg.task.iter() {
            let mut spec = TaskSpec::new(name.clone())
                .after(tc.after.iter().cloned())
                .action(build_task_action(name, tc, env));
            if let Some(ref text) = tc.description {
                spec = spec.description(text.clone());
            }
            scheduler.register(spec)?;
        }

        debug!(tasks = scheduler.registry.len(), "scheduler built from config");
        Ok(scheduler)
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn register(&mut self, spec: TaskSpec) -> Result<TaskId, SchedulerError> {
        self.registry.register(spec)
    }

    /// Check every registered task for unknown references and cycles.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        validate_all(self.registry.graph())
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.registry.task_names()
    }

    pub fn describe(&self, name: &str) -> Option<&str> {
        self.registry.description_of(name)
    }

    pub fn prerequisites_of(&self, name: &str) -> Option<Vec<TaskName>> {
        self.registry.prerequisites_of(name)
    }

    /// Resolved execution order for `targets`, without running anything.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<TaskName>, SchedulerError> {
        let plan = self.resolve_targets(targets)?;
        Ok(self.registry.graph().names_of(plan.order()))
    }

    /// Run `name` and all of its transitive prerequisites.
    pub async fn run(&self, name: &str) -> Result<RunReport, SchedulerError> {
        self.run_targets(&[name]).await
    }

    /// Run the configured default task.
    pub async fn run_default(&self) -> Result<RunReport, SchedulerError> {
        self.run(&self.options.default_task).await
    }

    /// Run several targets in one invocation; shared prerequisites still run
    /// only once.
    pub async fn run_targets<S: AsRef<str>>(
        &self,
        targets: &[S],
    ) -> Result<RunReport, SchedulerError> {
        let plan = self.resolve_targets(targets)?;
        execute(&self.registry, plan, &self.options, None).await
    }

    /// Like [`Scheduler::run_targets`], stopping early once `cancel` fires.
    ///
    /// Cancellation prevents any not-yet-started action from being invoked;
    /// actions already running are left to finish.
    pub async fn run_with_cancel<S: AsRef<str>>(
        &self,
        targets: &[S],
        cancel: oneshot::Receiver<()>,
    ) -> Result<RunReport, SchedulerError> {
        let plan = self.resolve_targets(targets)?;
        execute(&self.registry, plan, &self.options, Some(cancel)).await
    }

    fn resolve_targets<S: AsRef<str>>(&self, targets: &[S]) -> Result<ExecutionPlan, SchedulerError> {
        let roots = targets
            .iter()
            .map(|t| {
                let name = t.as_ref();
                self.registry
                    .lookup(name)
                    .ok_or_else(|| SchedulerError::UnknownTask(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let plan = resolve(self.registry.graph(), &roots)?;
        let names: Vec<&str> = targets.iter().map(|t| t.as_ref()).collect();
        info!(
            targets = ?names,
            order = ?self.registry.graph().names_of(plan.order()),
            "resolved execution order"
        );
        Ok(plan)
    }
}
