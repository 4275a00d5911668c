use anyhow::{Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

pub const MANIFEST_FILE: &str = "package.json";

/// The subset of `package.json` the deployer cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub workspaces: Option<Workspaces>,
}

/// `workspaces` is either a bare list of globs or `{ "packages": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    Globs(Vec<String>),
    Config { packages: Vec<String> },
}

impl Workspaces {
    pub fn patterns(&self) -> &[String] {
        match self {
            Workspaces::Globs(globs) => globs,
            Workspaces::Config { packages } => packages,
        }
    }
}

impl Manifest {
    /// Runtime and dev dependencies merged into one map. Runtime entries win
    /// when a name appears in both.
    pub fn merged_dependencies(&self) -> BTreeMap<String, String> {
        let mut merged = self.dev_dependencies.clone();
        merged.extend(
            self.dependencies
                .iter()
                .map(|(name, range)| (name.clone(), range.clone())),
        );
        merged
    }

    pub fn is_workspace_root(&self) -> bool {
        self.workspaces
            .as_ref()
            .is_some_and(|w| !w.patterns().is_empty())
    }
}

/// Read `<dir>/package.json`. Returns `Ok(None)` when there is no manifest.
#[tracing::instrument(skip(runtime))]
pub fn read_manifest<R: Runtime + ?Sized>(runtime: &R, dir: &Path) -> Result<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !runtime.exists(&path) {
        return Ok(None);
    }
    let content = runtime.read_to_string(&path)?;
    let manifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest {:?}", path))?;
    Ok(Some(manifest))
}

/// Resolve one workspace entry (`packages/*`, `apps/web`) relative to `root`.
///
/// Only the last path component may be a glob, and it is matched against the
/// direct children of its parent directory.
pub fn expand_workspace<R: Runtime + ?Sized>(
    runtime: &R,
    root: &Path,
    entry: &str,
) -> Result<Vec<PathBuf>> {
    let entry = entry.trim_start_matches("./").trim_end_matches('/');
    let full = root.join(entry);

    let Some(last) = full.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(Vec::new());
    };

    if !last.contains(['*', '?', '[']) {
        return Ok(if runtime.is_dir(&full) {
            vec![full]
        } else {
            Vec::new()
        });
    }

    let parent = full.parent().unwrap_or(root);
    let pattern = Pattern::new(&last)
        .with_context(|| format!("Invalid workspace pattern '{}'", entry))?;

    if !runtime.is_dir(parent) {
        return Ok(Vec::new());
    }

    let members = runtime
        .read_dir(parent)?
        .into_iter()
        .filter(|path| runtime.is_dir(path))
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
        })
        .collect();
    Ok(members)
}
