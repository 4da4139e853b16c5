// src/exec/mod.rs

//! Task actions.
//!
//! - [`action`] defines [`Action`], the [`Completion`] signal and
//!   [`TaskContext`].
//! - [`steps`] runs the built-in filesystem steps.
//! - [`command`] runs shell commands (minifiers, archivers, ...).
//! - [`placeholders`] implements `@@var` substitution.

pub mod action;
pub mod command;
pub mod placeholders;
pub mod steps;

use std::sync::Arc;

use tracing::{debug, warn};

pub use action::{Action, ActionFuture, Completion, TaskContext};
pub use command::run_command;
pub use placeholders::Placeholders;
pub use steps::{run_steps, StepEnv};

use crate::config::TaskConfig;

/// Turn a `[task.<name>]` section into an [`Action`].
///
/// - no `steps`, no `cmd`: an aggregate task ([`Action::noop`]).
/// - `steps` only: a synchronous action.
/// - `cmd`: a completion-signal action that runs the steps on a blocking
///   worker, then the command, and fires the signal with the outcome.
pub fn build_task_action(name: &str, cfg: &TaskConfig, env: &StepEnv) -> Action {
    let steps = Arc::new(cfg.steps.clone());
    let env = env.clone();

    match cfg.cmd.clone() {
        None if steps.is_empty() => Action::noop(),
        None => Action::sync(move |ctx| run_steps(ctx.name(), &steps, &env)),
        Some(cmd) => {
            debug!(task = %name, cmd = %cmd, "task runs a shell command");
            Action::with_completion(move |ctx, mut done| {
                let steps = Arc::clone(&steps);
                let env = env.clone();
                let cmd = cmd.clone();
                tokio::spawn(async move {
                    let task = ctx.name().to_string();
                    // Dropping the work drops the child process, which kills it.
                    let result = tokio::select! {
                        result = run_steps_then_command(ctx, steps, env, cmd) => Some(result),
                        _ = done.closed() => None,
                    };
                    match result {
                        Some(result) => done.finish(result),
                        None => warn!(task = %task, "task abandoned; stopping its command"),
                    }
                });
            })
        }
    }
}

async fn run_steps_then_command(
    ctx: TaskContext,
    steps: Arc<Vec<crate::config::Step>>,
    env: StepEnv,
    cmd: String,
) -> anyhow::Result<()> {
    if !steps.is_empty() {
        let name = ctx.name().to_string();
        let step_env = env.clone();
        tokio::task::spawn_blocking(move || run_steps(&name, &steps, &step_env))
            .await
            .map_err(|e| anyhow::anyhow!("steps of task '{}' panicked: {}", ctx.name(), e))??;
    }
    run_command(ctx.name(), &cmd, &env.root).await
}
