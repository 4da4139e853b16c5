// src/exec/action.rs

//! Units of work attached to tasks, and the completion signal that lets an
//! action finish after it has returned.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::debug;

use crate::errors::ActionError;
use crate::types::TaskName;

/// Boxed future returned by future-style actions.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Future the runtime awaits for a single dispatched action.
pub(crate) type InvokedAction =
    Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'static>>;

type SyncFn = dyn Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync;
type SignalFn = dyn Fn(TaskContext, Completion) + Send + Sync;
type FutureFn = dyn Fn(TaskContext) -> ActionFuture + Send + Sync;

/// Information handed to an action when it is invoked.
#[derive(Debug, Clone)]
pub struct TaskContext {
    name: TaskName,
}

impl TaskContext {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self { name: name.into() }
    }

    /// Name of the task whose action is running.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One-shot completion signal for asynchronous actions.
///
/// Every method consumes the signal, so it can fire at most once. Dropping it
/// without firing fails the task with [`ActionError::SignalDropped`].
#[derive(Debug)]
pub struct Completion {
    task: TaskName,
    tx: oneshot::Sender<anyhow::Result<()>>,
}

impl Completion {
    pub(crate) fn channel(task: TaskName) -> (Self, oneshot::Receiver<anyhow::Result<()>>) {
        let (tx, rx) = oneshot::channel();
        (Self { task, tx }, rx)
    }

    /// Report success.
    pub fn done(self) {
        self.finish(Ok(()));
    }

    /// Report failure.
    pub fn fail(self, err: impl Into<anyhow::Error>) {
        self.finish(Err(err.into()));
    }

    /// Resolves once nobody is waiting for this signal any more, e.g. the
    /// task timed out. Work tied to the signal should stop at that point.
    pub async fn closed(&mut self) {
        self.tx.closed().await;
    }

    /// Report whatever `result` says.
    pub fn finish(self, result: anyhow::Result<()>) {
        if self.tx.send(result).is_err() {
            debug!(
                task = %self.task,
                "completion signalled after the run stopped waiting for it"
            );
        }
    }
}

/// The work a task performs.
///
/// - [`Action::noop`] for aggregate tasks that only exist for their
///   prerequisites.
/// - [`Action::sync`] returns its result directly; it is run on a blocking
///   worker so it may do filesystem IO.
/// - [`Action::with_completion`] receives a [`Completion`] and may fire it
///   later, from any thread or task.
/// - [`Action::future`] returns a future that resolves to the result.
#[derive(Clone, Default)]
pub enum Action {
    #[default]
    Noop,
    Sync(Arc<SyncFn>),
    Signal(Arc<SignalFn>),
    Future(Arc<FutureFn>),
}

impl Action {
    pub fn noop() -> Self {
        Action::Noop
    }

    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Action::Sync(Arc::new(f))
    }

    pub fn with_completion<F>(f: F) -> Self
    where
        F: Fn(TaskContext, Completion) + Send + Sync + 'static,
    {
        Action::Signal(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Action::Future(Arc::new(move |ctx: TaskContext| -> ActionFuture {
            Box::pin(f(ctx))
        }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Noop => "noop",
            Action::Sync(_) => "sync",
            Action::Signal(_) => "signal",
            Action::Future(_) => "future",
        }
    }

    /// Start the action. The returned future resolves once the action has
    /// reported its outcome.
    pub(crate) fn invoke(&self, ctx: TaskContext) -> InvokedAction {
        match self {
            Action::Noop => Box::pin(async { Ok(()) }),
            Action::Sync(f) => {
                let f = Arc::clone(f);
                Box::pin(async move {
                    match tokio::task::spawn_blocking(move || f(&ctx)).await {
                        Ok(result) => result.map_err(ActionError::Failed),
                        Err(err) => Err(join_error(err)),
                    }
                })
            }
            Action::Signal(f) => {
                let f = Arc::clone(f);
                Box::pin(async move {
                    let (completion, rx) = Completion::channel(ctx.name.clone());
                    f(ctx, completion);
                    match rx.await {
                        Ok(result) => result.map_err(ActionError::Failed),
                        Err(_) => Err(ActionError::SignalDropped),
                    }
                })
            }
            Action::Future(f) => {
                let fut = f(ctx);
                Box::pin(async move { fut.await.map_err(ActionError::Failed) })
            }
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action::{}", self.kind())
    }
}

/// Convert a worker join failure into an [`ActionError`].
pub(crate) fn join_error(err: JoinError) -> ActionError {
    if err.is_panic() {
        let payload = err.into_panic();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ActionError::Panicked(msg)
    } else {
        ActionError::Panicked("worker task was aborted".to_string())
    }
}
