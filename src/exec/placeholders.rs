// src/exec/placeholders.rs

//! `@@name` placeholder substitution used by the `replace` step.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fs::FileSystem;

/// Prefix that turns a `[vars]` key into a placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "@@";

#[derive(Debug, Deserialize)]
struct Manifest {
    version: String,
}

/// Read the `version` field of a JSON manifest such as `package.json`.
pub fn manifest_version(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let text = fs.read_to_string(path)?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("reading `version` from {:?}", path))?;
    Ok(manifest.version)
}

/// Token → replacement table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    entries: BTreeMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `[vars]`, adding `@@date` (today, `YYYY-MM-DD`) unless a
    /// `date` var overrides it.
    pub fn from_vars(vars: &BTreeMap<String, String>) -> Self {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        Self::from_vars_on(vars, &today)
    }

    /// Like [`Placeholders::from_vars`] with an explicit date.
    pub fn from_vars_on(vars: &BTreeMap<String, String>, date: &str) -> Self {
        let mut table = Self::new();
        table.insert_var("date", date);
        for (key, value) in vars.iter() {
            table.insert_var(key, value);
        }
        table
    }

    /// Register `@@key`.
    pub fn insert_var(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(format!("{PLACEHOLDER_PREFIX}{key}"), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    /// Replace every occurrence of every token in `text`.
    pub fn apply(&self, text: &str) -> String {
        self.apply_with(text, &BTreeMap::new())
    }

    /// Same as [`Placeholders::apply`], with extra literal patterns that take
    /// precedence over the table.
    pub fn apply_with(&self, text: &str, extra: &BTreeMap<String, String>) -> String {
        let mut pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .filter(|(token, _)| !extra.contains_key(*token))
            .chain(extra.iter())
            .filter(|(token, _)| !token.is_empty())
            .map(|(t, v)| (t.as_str(), v.as_str()))
            .collect();

        // Longest tokens first so "@@version" is not clobbered by "@@ver".
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

        // Single left-to-right scan: replacement values are never rescanned.
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            match pairs.iter().find(|(token, _)| rest.starts_with(token)) {
                Some((token, value)) => {
                    out.push_str(value);
                    rest = &rest[token.len()..];
                }
                None => {
                    out.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }
        out
    }
}
