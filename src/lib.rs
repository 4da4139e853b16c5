// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, parse_duration, ConfigFile};
use crate::dag::Scheduler;
use crate::engine::RunOptions;
use crate::errors::{MakedagError, Result};
use crate::exec::placeholders::manifest_version;
use crate::exec::{Placeholders, StepEnv};
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the step environment (filesystem + placeholders)
/// - the scheduler
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let options = run_options(&cfg, &args)?;
    let root_dir = config_root_dir(&config_path);
    debug!(root = %root_dir.display(), ?options, "run options resolved");

    let fs = Arc::new(RealFileSystem);
    let placeholders = placeholders_for(&cfg, fs.as_ref(), &root_dir)?;
    let env = StepEnv::new(root_dir, fs, placeholders);
    let scheduler = Scheduler::from_config(&cfg, &env, options)?;

    if args.list {
        print_task_list(&scheduler);
        return Ok(());
    }

    let targets = if args.tasks.is_empty() {
        vec![scheduler.options().default_task.clone()]
    } else {
        args.tasks.clone()
    };

    if args.dry_run {
        let order = scheduler.plan(&targets)?;
        println!("makedag dry-run");
        println!("  targets: {}", targets.join(", "));
        println!("  jobs: {}", scheduler.options().jobs);
        println!();
        println!("execution order ({}):", order.len());
        for (i, name) in order.iter().enumerate() {
            println!("  {}. {name}", i + 1);
        }
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    // Ctrl-C → stop dispatching new tasks.
    let (cancel_tx, cancel_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; waiting for running tasks to finish");
        let _ = cancel_tx.send(());
    });

    match scheduler.run_with_cancel(&targets, cancel_rx).await {
        Ok(report) => {
            info!("{}", report.summary());
            Ok(())
        }
        Err(err) => {
            if let Some(report) = err.report() {
                eprintln!("{}", report.summary());
            }
            Err(err.into())
        }
    }
}

/// Config-file options with CLI overrides applied.
fn run_options(cfg: &ConfigFile, args: &CliArgs) -> Result<RunOptions> {
    let mut options = cfg.run_options();

    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(MakedagError::ConfigError(
                "--jobs must be at least 1".to_string(),
            ));
        }
        options.jobs = jobs;
    }

    if let Some(ref raw) = args.timeout {
        let timeout = parse_duration(raw)
            .map_err(|e| MakedagError::ConfigError(format!("invalid --timeout: {e}")))?;
        options.task_timeout = Some(timeout);
    }

    Ok(options)
}

/// `[vars]` plus `@@date`, and `@@version` from `[config].version_from` when
/// `[vars]` does not set it.
fn placeholders_for(cfg: &ConfigFile, fs: &dyn FileSystem, root: &Path) -> Result<Placeholders> {
    let mut placeholders = Placeholders::from_vars(&cfg.vars);

    if let Some(ref manifest) = cfg.config.version_from {
        if cfg.vars.contains_key("version") {
            debug!(manifest = %manifest, "[vars].version set; ignoring version_from");
        } else {
            let version = manifest_version(fs, &root.join(manifest))?;
            debug!(manifest = %manifest, version = %version, "@@version from manifest");
            placeholders.insert_var("version", version);
        }
    }

    Ok(placeholders)
}

/// Figure out the project root that relative step paths resolve against.
///
/// - If the config path has a non-empty parent (e.g. "web/Makedag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Makedag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_task_list(scheduler: &Scheduler) {
    let names: Vec<&str> = scheduler.task_names().collect();
    println!("tasks ({}):", names.len());
    for name in names {
        match scheduler.describe(name) {
            Some(text) => println!("  - {name}: {text}"),
            None => println!("  - {name}"),
        }
        if let Some(prereqs) = scheduler.prerequisites_of(name) {
            if !prereqs.is_empty() {
                println!("      after: {}", prereqs.join(", "));
            }
        }
    }
}
