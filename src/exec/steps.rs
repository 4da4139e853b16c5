// src/exec/steps.rs

//! Built-in filesystem steps (`remove`, `mkdir`, `copy`, `concat`,
//! `replace`), run synchronously against a [`FileSystem`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use globset::GlobBuilder;
use tracing::{debug, info, warn};

use crate::config::Step;
use crate::exec::placeholders::Placeholders;
use crate::fs::FileSystem;

/// Everything a step needs besides its own parameters.
#[derive(Clone)]
pub struct StepEnv {
    /// Relative step paths resolve against this directory.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub placeholders: Arc<Placeholders>,
}

impl fmt::Debug for StepEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepEnv")
            .field("root", &self.root)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl StepEnv {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, placeholders: Placeholders) -> Self {
        Self {
            root: root.into(),
            fs,
            placeholders: Arc::new(placeholders),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

/// Run `steps` in order, stopping at the first error.
pub fn run_steps(task: &str, steps: &[Step], env: &StepEnv) -> Result<()> {
    for (idx, step) in steps.iter().enumerate() {
        debug!(task = %task, step = idx + 1, op = step.op_name(), "running step");
        run_step(step, env)
            .with_context(|| format!("step {} ({}) of task '{}'", idx + 1, step.op_name(), task))?;
    }
    Ok(())
}

pub fn run_step(step: &Step, env: &StepEnv) -> Result<()> {
    match step {
        Step::Remove { path } => env.fs.remove_all(&env.resolve(path)),
        Step::Mkdir { path } => env.fs.create_dir_all(&env.resolve(path)),
        Step::Copy { from, to } => copy(env, from, to),
        Step::Concat {
            src,
            dest,
            header_file,
            header,
            separator,
            footer,
        } => concat(
            env,
            src,
            dest,
            header_file.as_deref(),
            header.as_deref(),
            separator,
            footer.as_deref(),
        ),
        Step::Replace { file, patterns } => replace(env, file, patterns),
    }
}

fn concat(
    env: &StepEnv,
    src: &[String],
    dest: &str,
    header_file: Option<&str>,
    header: Option<&str>,
    separator: &str,
    footer: Option<&str>,
) -> Result<()> {
    let mut out = String::new();

    if let Some(path) = header_file {
        out.push_str(&env.fs.read_to_string(&env.resolve(path))?);
    }
    if let Some(text) = header {
        out.push_str(text);
    }

    let parts = src
        .iter()
        .map(|path| env.fs.read_to_string(&env.resolve(path)))
        .collect::<Result<Vec<_>>>()?;
    out.push_str(&parts.join(separator));

    if let Some(text) = footer {
        out.push_str(text);
    }

    let dest = env.resolve(dest);
    env.fs.write(&dest, out.as_bytes())?;
    info!(dest = %dest.display(), files = src.len(), "created");
    Ok(())
}

fn replace(env: &StepEnv, file: &str, patterns: &BTreeMap<String, String>) -> Result<()> {
    let path = env.resolve(file);
    let text = env.fs.read_to_string(&path)?;
    let replaced = env.placeholders.apply_with(&text, patterns);
    env.fs.write(&path, replaced.as_bytes())
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn copy(env: &StepEnv, from: &str, to: &str) -> Result<()> {
    let dest = env.resolve(to);

    if is_glob(from) {
        return copy_glob(env, from, &dest);
    }

    let src = env.resolve(from);
    if env.fs.is_dir(&src) {
        let name = src
            .file_name()
            .with_context(|| format!("cannot copy directory {:?} without a name", src))?;
        copy_tree(env.fs.as_ref(), &src, &dest.join(name))
    } else if env.fs.is_file(&src) {
        let into_dir = to.ends_with('/') || to.ends_with('\\') || env.fs.is_dir(&dest);
        let target = if into_dir {
            let name = src
                .file_name()
                .with_context(|| format!("source {:?} has no file name", src))?;
            dest.join(name)
        } else {
            dest
        };
        copy_file(env.fs.as_ref(), &src, &target)
    } else {
        bail!("copy source {:?} does not exist", src)
    }
}

fn copy_file(fs: &dyn FileSystem, src: &Path, dest: &Path) -> Result<()> {
    let bytes = fs.read(src)?;
    fs.write(dest, &bytes)?;
    debug!(from = %src.display(), to = %dest.display(), "copied");
    Ok(())
}

fn copy_tree(fs: &dyn FileSystem, src: &Path, dest: &Path) -> Result<()> {
    fs.create_dir_all(dest)?;
    for entry in fs.read_dir(src)? {
        let name = entry
            .file_name()
            .with_context(|| format!("directory entry {:?} has no name", entry))?;
        if fs.is_dir(&entry) {
            copy_tree(fs, &entry, &dest.join(name))?;
        } else {
            copy_file(fs, &entry, &dest.join(name))?;
        }
    }
    Ok(())
}

/// Split `pattern` into its literal directory prefix and the glob remainder.
fn split_glob(pattern: &str) -> (PathBuf, String) {
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();

    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy().to_string();
        if rest.is_empty() && !is_glob(&text) {
            match component {
                Component::CurDir => {}
                _ => base.push(component),
            }
        } else {
            rest.push(text);
        }
    }

    (base, rest.join("/"))
}

fn copy_glob(env: &StepEnv, pattern: &str, dest: &Path) -> Result<()> {
    let (base, glob) = split_glob(pattern);
    let matcher = GlobBuilder::new(&glob)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern '{}'", pattern))?
        .compile_matcher();

    let base = if base.as_os_str().is_empty() {
        env.root.clone()
    } else {
        env.resolve(&base.to_string_lossy())
    };
    if !env.fs.is_dir(&base) {
        bail!("glob base directory {:?} does not exist", base);
    }

    let mut files = Vec::new();
    collect_files(env.fs.as_ref(), &base, &mut files)?;

    let mut copied = 0usize;
    for file in files {
        let Ok(rel) = file.strip_prefix(&base) else {
            continue;
        };
        if matcher.is_match(rel) {
            copy_file(env.fs.as_ref(), &file, &dest.join(rel))?;
            copied += 1;
        }
    }

    if copied == 0 {
        warn!(pattern = %pattern, "glob matched no files");
    } else {
        debug!(pattern = %pattern, copied, "copied glob matches");
    }
    Ok(())
}

fn collect_files(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        if fs.is_dir(&entry) {
            collect_files(fs, &entry, out)?;
        } else {
            out.push(entry);
        }
    }
    Ok(())
}
