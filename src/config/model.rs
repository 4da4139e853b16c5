// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::engine::RunOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// default_task = "default"
/// jobs = 1
/// task_timeout = "5m"
///
/// [vars]
/// version = "2.3.0"
///
/// [task.build]
/// description = "Build the library"
/// after = ["clear"]
/// steps = [{ op = "concat", src = ["src/a.js", "src/b.js"], dest = "lib.js" }]
/// cmd = "uglifyjs lib.js -o lib-min.js"
/// ```
///
/// All sections except `[task.*]` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Placeholder values from `[vars]`; each key `k` becomes `@@k`.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration. Construct via `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub vars: BTreeMap<String, String>,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        vars: BTreeMap<String, String>,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { config, vars, task }
    }

    /// Parsed `task_timeout`. Validation guarantees it parses.
    pub fn task_timeout(&self) -> Option<Duration> {
        self.config
            .task_timeout
            .as_deref()
            .and_then(|s| parse_duration(s).ok())
    }

    pub fn default_task(&self) -> &str {
        self.config
            .default_task
            .as_deref()
            .unwrap_or(DEFAULT_TASK)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            jobs: self.config.jobs,
            task_timeout: self.task_timeout(),
            default_task: self.default_task().to_string(),
        }
    }
}

pub(crate) const DEFAULT_TASK: &str = "default";

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Task to run when none is named on the command line.
    #[serde(default)]
    pub default_task: Option<String>,

    /// Maximum number of tasks running at once.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Per-task completion timeout, e.g. `"30s"`.
    #[serde(default)]
    pub task_timeout: Option<String>,

    /// JSON manifest (e.g. `"package.json"`) whose `version` field becomes
    /// `@@version`. An explicit `[vars].version` wins.
    #[serde(default)]
    pub version_from: Option<String>,
}

fn default_jobs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_task: None,
            jobs: default_jobs(),
            task_timeout: None,
            version_from: None,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Prerequisites: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Built-in filesystem steps, run in order.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Shell command run after `steps` (minifiers, archivers, ...).
    #[serde(default)]
    pub cmd: Option<String>,
}

/// A built-in build step. Paths are relative to the config file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// `rm -rf path`.
    Remove { path: String },

    /// `mkdir -p path`.
    Mkdir { path: String },

    /// Copy a file, a directory, or every file matching a glob.
    Copy { from: String, to: String },

    /// Concatenate `src` into `dest`.
    Concat {
        src: Vec<String>,
        dest: String,
        #[serde(default)]
        header_file: Option<String>,
        #[serde(default)]
        header: Option<String>,
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default)]
        footer: Option<String>,
    },

    /// Replace every `@@var` placeholder (plus `patterns`) in `file`.
    Replace {
        file: String,
        #[serde(default)]
        patterns: BTreeMap<String, String>,
    },
}

fn default_separator() -> String {
    "\n".to_string()
}

impl Step {
    pub fn op_name(&self) -> &'static str {
        match self {
            Step::Remove { .. } => "remove",
            Step::Mkdir { .. } => "mkdir",
            Step::Copy { .. } => "copy",
            Step::Concat { .. } => "concat",
            Step::Replace { .. } => "replace",
        }
    }
}
