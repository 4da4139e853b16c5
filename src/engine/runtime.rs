// src/engine/runtime.rs

//! Async shell around [`RunCore`].
//!
//! Actions are spawned onto a [`JoinSet`]; their completions flow back into
//! the core, which is the only writer of the per-run state table.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::{ExecutionPlan, TaskId, TaskRegistry};
use crate::engine::core::RunCore;
use crate::engine::report::RunReport;
use crate::engine::RunOptions;
use crate::errors::{ActionError, SchedulerError};
use crate::exec::action::join_error;
use crate::exec::{Action, TaskContext};

type Outcome = (TaskId, Result<(), ActionError>);

/// Run every task in `plan`, honouring dependencies, the job limit, the
/// per-task timeout and an optional cancellation signal.
pub async fn execute(
    registry: &TaskRegistry,
    plan: ExecutionPlan,
    options: &RunOptions,
    mut cancel: Option<oneshot::Receiver<()>>,
) -> Result<RunReport, SchedulerError> {
    info!(
        tasks = plan.len(),
        jobs = options.jobs,
        timeout = ?options.task_timeout,
        "run started"
    );

    let mut core = RunCore::new(registry.graph(), plan, options.jobs);
    let mut in_flight: JoinSet<Outcome> = JoinSet::new();
    let mut spawned: HashMap<tokio::task::Id, TaskId> = HashMap::new();

    loop {
        for id in core.next_ready() {
            let action = registry
                .def(id)
                .map(|def| def.action.clone())
                .unwrap_or_default();
            let ctx = TaskContext::new(core.graph().name(id));
            let handle = in_flight.spawn(run_action(id, action, ctx, options.task_timeout));
            spawned.insert(handle.id(), id);
        }

        if in_flight.is_empty() {
            break;
        }

        tokio::select! {
            joined = in_flight.join_next_with_id() => {
                match joined {
                    Some(Ok((task_id, (id, result)))) => {
                        spawned.remove(&task_id);
                        core.complete(id, result);
                    }
                    Some(Err(err)) => match spawned.remove(&err.id()) {
                        Some(id) => core.complete(id, Err(join_error(err))),
                        None => warn!(error = %err, "worker finished for an unknown task"),
                    },
                    None => break,
                }
            }
            fired = wait_for_cancel(&mut cancel) => {
                cancel = None;
                if fired {
                    core.cancel();
                } else {
                    debug!("cancel handle dropped; run continues without cancellation");
                }
            }
        }
    }

    let result = core.finish();
    match &result {
        Ok(report) => info!(ran = report.ran.len(), "run finished"),
        Err(err) => warn!(error = %err, "run finished with an error"),
    }
    result
}

async fn run_action(
    id: TaskId,
    action: Action,
    ctx: TaskContext,
    timeout: Option<Duration>,
) -> Outcome {
    let name = ctx.name().to_string();
    let fut = action.invoke(ctx);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(task = %name, ?limit, "task did not signal completion in time");
                Err(ActionError::TimedOut(limit))
            }
        },
        None => fut.await,
    };

    (id, result)
}

/// Resolves to `true` when cancellation is requested and to `false` when the
/// sender is dropped. Never resolves if there is no receiver.
async fn wait_for_cancel(cancel: &mut Option<oneshot::Receiver<()>>) -> bool {
    match cancel {
        Some(rx) => rx.await.is_ok(),
        None => std::future::pending().await,
    }
}
