use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::config::ListingPolicy;
use crate::git::{Git, SyncDirection, sync_repository};
use crate::runtime::Runtime;

use super::{Outcome, run_batched};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    pub name: String,
    pub path: PathBuf,
}

/// Git checkouts found directly under a folder.
#[derive(Debug, Clone, Default)]
pub struct LocalRepositories {
    repositories: Vec<LocalRepository>,
}

impl LocalRepositories {
    /// Every child directory of `path` that contains `.git`.
    #[tracing::instrument(skip(runtime))]
    pub fn scan<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.is_dir(path) {
            debug!("{:?} does not exist, no local repositories", path);
            return Ok(Self::default());
        }

        let mut repositories = Vec::new();
        for entry in runtime
            .read_dir(path)
            .with_context(|| format!("Failed to read {:?}", path))?
        {
            if !runtime.is_dir(&entry) || !runtime.exists(&entry.join(".git")) {
                continue;
            }
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            repositories.push(LocalRepository {
                name: name.to_string(),
                path: entry.clone(),
            });
        }

        debug!("Found {} repositories in {:?}", repositories.len(), path);
        Ok(Self { repositories })
    }

    /// Keep repositories whose folder name the policy allows.
    pub fn filter_by_policy(self, policy: &ListingPolicy) -> Self {
        Self {
            repositories: self
                .repositories
                .into_iter()
                .filter(|r| policy.allows(&r.name))
                .collect(),
        }
    }

    pub fn repositories(&self) -> &[LocalRepository] {
        &self.repositories
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Pull repositories that have an `origin` remote. `Ok(false)` marks a
    /// repository without one.
    pub async fn pull<G: Git + ?Sized>(&self, git: &G) -> Vec<Outcome<bool>> {
        let jobs = self
            .repositories
            .iter()
            .map(|repo| {
                let job = async move {
                    if git.remote_url(&repo.path).await?.is_none() {
                        info!("Repository {} has no remote", repo.name);
                        return Ok(false);
                    }
                    git.pull(&repo.path).await?;
                    Ok(true)
                };
                (repo.name.clone(), job)
            })
            .collect();
        run_batched(jobs).await
    }

    pub async fn push<G: Git + ?Sized>(&self, git: &G) -> Vec<Outcome<()>> {
        let jobs = self
            .repositories
            .iter()
            .map(|repo| (repo.name.clone(), git.push(&repo.path)))
            .collect();
        run_batched(jobs).await
    }

    /// Pull or push each repository depending on which side has the newer
    /// commit.
    pub async fn update<G: Git + ?Sized>(&self, git: &G) -> Vec<Outcome<SyncDirection>> {
        let jobs = self
            .repositories
            .iter()
            .map(|repo| (repo.name.clone(), sync_repository(git, &repo.path)))
            .collect();
        run_batched(jobs).await
    }
}

/// Remove every folder under `path` whose name is in `names`.
#[tracing::instrument(skip(runtime, names))]
pub fn delete_listed<R: Runtime + ?Sized>(
    runtime: &R,
    path: &Path,
    names: &[String],
) -> Result<Vec<PathBuf>> {
    if names.is_empty() || !runtime.is_dir(path) {
        return Ok(Vec::new());
    }

    let mut deleted = Vec::new();
    for entry in runtime.read_dir(path)? {
        let listed = entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| names.iter().any(|b| b == n));
        if listed && runtime.is_dir(&entry) {
            runtime
                .remove_dir_all(&entry)
                .with_context(|| format!("Failed to delete {:?}", entry))?;
            info!("Deleted {:?}", entry);
            deleted.push(entry);
        }
    }
    Ok(deleted)
}
