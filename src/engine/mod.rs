// src/engine/mod.rs

//! Run engine.
//!
//! - [`state`] holds the per-run task state table.
//! - [`core`] is the pure, synchronous run state machine.
//! - [`runtime`] is the async shell that spawns actions and waits for their
//!   completion signals.
//! - [`report`] summarises what ran and what was skipped.

use std::time::Duration;

use crate::types::TaskName;

pub mod core;
pub mod report;
pub mod runtime;
pub mod state;

pub use self::core::RunCore;
pub use report::RunReport;
pub use runtime::execute;
pub use state::StateTable;

/// Options that shape a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum number of actions in flight at once (at least 1).
    pub jobs: usize,
    /// Fail a task that has not signalled completion within this duration.
    pub task_timeout: Option<Duration>,
    /// Task run when no target is named.
    pub default_task: TaskName,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            task_timeout: None,
            default_task: "default".to_string(),
        }
    }
}
