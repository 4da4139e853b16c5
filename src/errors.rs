// src/errors.rs

//! Crate-wide error types.
//!
//! - [`MakedagError`] is what the CLI surface returns (config, IO, scheduler).
//! - [`SchedulerError`] is the registration / run taxonomy.
//! - [`ActionError`] describes why a single task's action did not succeed.

use std::time::Duration;

use thiserror::Error;

use crate::engine::RunReport;
use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum MakedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by [`crate::dag::Scheduler`].
///
/// Registration errors come back from `register` immediately; everything else
/// is reported once, when `run` completes.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),

    #[error("task '{task}' depends on unknown task '{missing}'")]
    InvalidReference { task: TaskName, missing: TaskName },

    #[error("cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Task names along the cycle, with the first name repeated at the end.
        cycle: Vec<TaskName>,
    },

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: TaskName,
        #[source]
        source: ActionError,
        /// Transitive dependents that were failed without running, in
        /// resolution order.
        dependents: Vec<TaskName>,
        report: Box<RunReport>,
    },

    #[error("run cancelled")]
    Cancelled { report: Box<RunReport> },
}

impl SchedulerError {
    /// The partial-completion report, for run-time failures.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            SchedulerError::TaskFailed { report, .. } | SchedulerError::Cancelled { report } => {
                Some(report)
            }
            _ => None,
        }
    }
}

/// Why an individual action did not complete successfully.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    #[error("timed out after {0:?} waiting for completion")]
    TimedOut(Duration),

    #[error("completion signal dropped without being fired")]
    SignalDropped,

    #[error("action panicked: {0}")]
    Panicked(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MakedagError>;
