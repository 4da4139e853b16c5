use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use makedag::exec::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpyEvent {
    Started,
    Completed,
}

#[derive(Debug, Clone)]
pub struct SpyRecord {
    pub task: String,
    pub event: SpyEvent,
    pub at: Instant,
}

/// Records when actions built from it start and complete.
///
/// Clones share the same log, so one `Spy` can hand out actions for every
/// task in a scheduler and be inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct Spy {
    log: Arc<Mutex<Vec<SpyRecord>>>,
}

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SpyRecord>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, task: &str, event: SpyEvent) {
        self.lock().push(SpyRecord {
            task: task.to_string(),
            event,
            at: Instant::now(),
        });
    }

    /// A synchronous action that succeeds immediately.
    pub fn action(&self, name: &str) -> Action {
        let spy = self.clone();
        let name = name.to_string();
        Action::sync(move |_| {
            spy.record(&name, SpyEvent::Started);
            spy.record(&name, SpyEvent::Completed);
            Ok(())
        })
    }

    /// A synchronous action that fails with `msg`.
    pub fn failing(&self, name: &str, msg: &str) -> Action {
        let spy = self.clone();
        let name = name.to_string();
        let msg = msg.to_string();
        Action::sync(move |_| {
            spy.record(&name, SpyEvent::Started);
            Err(anyhow!("{}", msg))
        })
    }

    /// A completion-signal action that fires its signal after `ms` milliseconds.
    pub fn delayed(&self, name: &str, ms: u64) -> Action {
        let spy = self.clone();
        let name = name.to_string();
        Action::with_completion(move |_, done| {
            spy.record(&name, SpyEvent::Started);
            let spy = spy.clone();
            let name = name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                spy.record(&name, SpyEvent::Completed);
                done.done();
            });
        })
    }

    /// A completion-signal action that fails its signal after `ms` milliseconds.
    pub fn delayed_failing(&self, name: &str, ms: u64, msg: &str) -> Action {
        let spy = self.clone();
        let name = name.to_string();
        let msg = msg.to_string();
        Action::with_completion(move |_, done| {
            spy.record(&name, SpyEvent::Started);
            let msg = msg.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                done.fail(anyhow!("{}", msg));
            });
        })
    }

    /// Task names in the order their actions were invoked.
    pub fn calls(&self) -> Vec<String> {
        self.events(SpyEvent::Started)
    }

    /// Task names in the order their actions completed successfully.
    pub fn completions(&self) -> Vec<String> {
        self.events(SpyEvent::Completed)
    }

    pub fn count(&self, name: &str) -> usize {
        self.lock()
            .iter()
            .filter(|r| r.task == name && r.event == SpyEvent::Started)
            .count()
    }

    pub fn started_at(&self, name: &str) -> Option<Instant> {
        self.find(name, SpyEvent::Started)
    }

    pub fn completed_at(&self, name: &str) -> Option<Instant> {
        self.find(name, SpyEvent::Completed)
    }

    fn events(&self, event: SpyEvent) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|r| r.event == event)
            .map(|r| r.task.clone())
            .collect()
    }

    fn find(&self, name: &str, event: SpyEvent) -> Option<Instant> {
        self.lock()
            .iter()
            .find(|r| r.task == name && r.event == event)
            .map(|r| r.at)
    }
}
