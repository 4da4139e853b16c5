// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `makedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "makedag",
    version,
    about = "Run build tasks in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run. Defaults to `[config].default_task` (or `default`).
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML).
    #[arg(long, short = 'f', value_name = "PATH", default_value = "Makedag.toml")]
    pub config: String,

    /// Maximum number of actions in flight at once. Overrides `[config].jobs`.
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-task timeout such as `30s` or `5m`. Overrides `[config].task_timeout`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MAKEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the execution order without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// List tasks with their descriptions and prerequisites.
    #[arg(long, short = 'l')]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_targets_and_overrides() {
        let args = CliArgs::try_parse_from([
            "makedag", "-j", "4", "--timeout", "30s", "build", "test",
        ])
        .unwrap();
        assert_eq!(args.tasks, vec!["build", "test"]);
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.timeout.as_deref(), Some("30s"));
        assert_eq!(args.config, "Makedag.toml");
        assert!(!args.dry_run);
    }

    #[test]
    fn no_targets_is_allowed() {
        let args = CliArgs::try_parse_from(["makedag", "--list"]).unwrap();
        assert!(args.tasks.is_empty());
        assert!(args.list);
    }
}
