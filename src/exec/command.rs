// src/exec/command.rs

//! Shell-command execution for tasks with a `cmd`.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Run `cmd` through the platform shell in `cwd` and wait for it to exit.
///
/// stdout lines are logged at `info`, stderr lines at `warn`, both tagged with
/// the task name. A non-zero exit status is an error.
pub async fn run_command(task: &str, cmd: &str, cwd: &Path) -> Result<()> {
    info!(task = %task, cmd = %cmd, "starting command");

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task))?;

    let stdout = child.stdout.take().map(|out| {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task, "{}", line);
            }
        })
    });

    // Always consume stderr so buffers don't fill.
    let stderr = child.stderr.take().map(|err| {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(task = %task, "stderr: {}", line);
            }
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task))?;

    for reader in [stdout, stderr].into_iter().flatten() {
        if let Err(e) = reader.await {
            debug!(task = %task, error = %e, "output reader ended abnormally");
        }
    }

    let code = status.code().unwrap_or(-1);
    debug!(task = %task, exit_code = code, success = status.success(), "command exited");

    if !status.success() {
        bail!("command `{}` exited with status {}", cmd, code);
    }
    Ok(())
}
