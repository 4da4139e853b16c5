#![allow(dead_code)]

use std::collections::BTreeMap;
use makedag::config::{ConfigFile, ConfigSection, RawConfigFile, Step, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                vars: BTreeMap::new(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.config.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = jobs;
        self
    }

    pub fn task_timeout(mut self, timeout: &str) -> Self {
        self.config.config.task_timeout = Some(timeout.to_string());
        self
    }

    pub fn default_task(mut self, name: &str) -> Self {
        self.config.config.default_task = Some(name.to_string());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
#[derive(Default)]
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.description = Some(text.to_string());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.task.steps.push(step);
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.task.cmd = Some(cmd.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
