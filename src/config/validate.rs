// src/config/validate.rs

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, Step, DEFAULT_TASK};
use crate::errors::{MakedagError, Result, SchedulerError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MakedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.vars, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_steps(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(MakedagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.jobs == 0 {
        return Err(MakedagError::ConfigError(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref timeout) = cfg.config.task_timeout {
        parse_duration(timeout).map_err(|e| {
            MakedagError::ConfigError(format!("[config].task_timeout: {e}"))
        })?;
    }

    if let Some(ref path) = cfg.config.version_from {
        if path.trim().is_empty() {
            return Err(MakedagError::ConfigError(
                "[config].version_from must not be empty".to_string(),
            ));
        }
    }

    // An implicit "default" may be absent (then a target must be named); an
    // explicit one must exist.
    if let Some(ref name) = cfg.config.default_task {
        if !cfg.task.contains_key(name) {
            return Err(MakedagError::ConfigError(format!(
                "[config].default_task '{}' is not a defined task (implicit default is '{}')",
                name, DEFAULT_TASK
            )));
        }
    }

    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(MakedagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(MakedagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_steps(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if let Some(ref cmd) = task.cmd {
            if cmd.trim().is_empty() {
                return Err(MakedagError::ConfigError(format!(
                    "task '{}' has an empty `cmd`",
                    name
                )));
            }
        }

        for (idx, step) in task.steps.iter().enumerate() {
            let problem = match step {
                Step::Remove { path } | Step::Mkdir { path } if path.trim().is_empty() => {
                    Some("`path` must not be empty")
                }
                Step::Copy { from, to } if from.trim().is_empty() || to.trim().is_empty() => {
                    Some("`from` and `to` must not be empty")
                }
                Step::Concat { src, .. } if src.is_empty() => Some("`src` must list at least one file"),
                Step::Concat { dest, .. } if dest.trim().is_empty() => {
                    Some("`dest` must not be empty")
                }
                Step::Replace { file, .. } if file.trim().is_empty() => {
                    Some("`file` must not be empty")
                }
                _ => None,
            };

            if let Some(problem) = problem {
                return Err(MakedagError::ConfigError(format!(
                    "task '{}' step {} ({}): {}",
                    name,
                    idx + 1,
                    step.op_name(),
                    problem
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: task -> prerequisite, so a cycle reads in the same
    // order the scheduler reports it.
    // For:
    //   [task.B]
    //   after = ["A"]
    // we add edge B -> A.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(name.as_str(), dep.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    if toposort(&graph, None).is_ok() {
        return Ok(());
    }

    let cycle = find_cycle(&graph).unwrap_or_default();
    Err(SchedulerError::CyclicDependency { cycle }.into())
}

/// Shortest cycle through the smallest-named task of the first strongly
/// connected component that loops, first name repeated at the end.
fn find_cycle(graph: &DiGraphMap<&str, ()>) -> Option<Vec<String>> {
    let component = tarjan_scc(graph)
        .into_iter()
        .filter(|c| c.len() > 1 || graph.contains_edge(c[0], c[0]))
        .min_by_key(|c| c.iter().min().copied())?;

    let members: HashSet<&str> = component.iter().copied().collect();
    let start = component.iter().min().copied()?;

    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let mut next: Vec<&str> = graph
            .neighbors(node)
            .filter(|n| members.contains(n))
            .collect();
        next.sort_unstable();

        for n in next {
            if n == start {
                let mut path = vec![node];
                let mut cur = node;
                while let Some(&p) = parent.get(cur) {
                    path.push(p);
                    cur = p;
                }
                path.reverse();
                path.push(start);
                return Some(path.into_iter().map(str::to_string).collect());
            }
            if !parent.contains_key(n) {
                parent.insert(n, node);
                queue.push_back(n);
            }
        }
    }

    None
}
