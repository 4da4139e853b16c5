use std::fmt;

/// Canonical task name type used at the registration boundary.
pub type TaskName = String;

/// Lifecycle of a task within a single scheduler run.
///
/// A fresh state table is built for every run, so a task always starts
/// `Pending` and never carries state over from a previous invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Part of the run's closure, action not yet started.
    Pending,
    /// Action dispatched and not yet signalled.
    Running,
    /// Action signalled success.
    Done,
    /// Action failed, or an upstream prerequisite failed.
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Pending
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}
