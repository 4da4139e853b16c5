// src/engine/report.rs

//! Outcome summary of a single run.

use std::fmt::Write as _;

use crate::types::{TaskName, TaskState};

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks whose action was invoked, in the order they were started.
    pub ran: Vec<TaskName>,
    /// Tasks in the closure whose action never ran, in resolution order.
    pub skipped: Vec<TaskName>,
    /// Final state of every task in the closure, in resolution order.
    pub states: Vec<(TaskName, TaskState)>,
}

impl RunReport {
    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, state)| *state)
    }

    /// Every task in the closure reached `Done`.
    pub fn succeeded(&self) -> bool {
        self.states.iter().all(|(_, s)| *s == TaskState::Done)
    }

    /// Human-readable multi-line summary for the CLI.
    pub fn summary(&self) -> String {
        let done = self
            .states
            .iter()
            .filter(|(_, s)| *s == TaskState::Done)
            .count();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{done}/{} tasks done; ran: [{}]",
            self.states.len(),
            self.ran.join(", ")
        );
        if !self.skipped.is_empty() {
            let _ = writeln!(out, "skipped: [{}]", self.skipped.join(", "));
        }
        for (name, state) in self.states.iter() {
            if *state == TaskState::Failed && self.ran.contains(name) {
                let _ = writeln!(out, "failed: {name}");
            }
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_names_ran_and_skipped() {
        let report = RunReport {
            ran: vec!["clean".into(), "build".into()],
            skipped: vec!["package".into()],
            states: vec![
                ("clean".into(), TaskState::Done),
                ("build".into(), TaskState::Failed),
                ("package".into(), TaskState::Failed),
            ],
        };

        assert!(!report.succeeded());
        assert_eq!(report.state_of("build"), Some(TaskState::Failed));
        let s = report.summary();
        assert!(s.contains("1/3 tasks done"));
        assert!(s.contains("ran: [clean, build]"));
        assert!(s.contains("skipped: [package]"));
        assert!(s.contains("failed: build"));
        assert!(!s.contains("failed: package"));
    }
}
