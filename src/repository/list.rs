use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ListingPolicy;
use crate::git::Git;
use crate::provider::{RepositoryInfo, RepositorySource};
use crate::runtime::{Runtime, write_atomic};

use super::{Outcome, run_batched};

/// Contents of `repositories.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryList {
    pub repositories: Vec<RepositoryInfo>,
    pub last_updated: DateTime<Utc>,
}

impl RepositoryList {
    pub fn new(repositories: Vec<RepositoryInfo>, last_updated: DateTime<Utc>) -> Self {
        Self {
            repositories,
            last_updated,
        }
    }

    pub async fn fetch<S: RepositorySource + ?Sized>(source: &S) -> Result<Self> {
        let repositories = source
            .list_repositories()
            .await
            .context("Couldn't fetch user repositories")?;
        info!("Fetched {} repositories", repositories.len());
        Ok(Self::new(repositories, Utc::now()))
    }

    /// `None` when the file does not exist.
    pub fn read<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Option<Self>> {
        if !runtime.exists(path) {
            return Ok(None);
        }
        let content = runtime.read_to_string(path)?;
        let list = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse repository list {:?}", path))?;
        Ok(Some(list))
    }

    /// The saved list, or a freshly fetched one when the file is missing or
    /// unreadable.
    #[tracing::instrument(skip(runtime, source))]
    pub async fn load_or_fetch<R, S>(runtime: &R, path: &Path, source: &S) -> Result<Self>
    where
        R: Runtime + ?Sized,
        S: RepositorySource + ?Sized,
    {
        match Self::read(runtime, path) {
            Ok(Some(list)) => {
                debug!("Loaded {} repositories from {:?}", list.repositories.len(), path);
                return Ok(list);
            }
            Ok(None) => {}
            Err(e) => warn!("{:#}, fetching again", e),
        }
        Self::fetch(source).await
    }

    /// Replace the saved list with the current one from `source`.
    pub async fn sync<R, S>(runtime: &R, path: &Path, source: &S) -> Result<Self>
    where
        R: Runtime + ?Sized,
        S: RepositorySource + ?Sized,
    {
        let list = Self::fetch(source).await?;
        list.save(runtime, path)?;
        Ok(list)
    }

    pub fn save<R: Runtime + ?Sized>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            runtime.create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(runtime, path, json.as_bytes())
            .with_context(|| format!("Failed to save repository list {:?}", path))
    }

    /// Repositories the policy allows, or all of them when `None`.
    pub fn selected(&self, policy: Option<&ListingPolicy>) -> Vec<&RepositoryInfo> {
        self.repositories
            .iter()
            .filter(|r| policy.is_none_or(|policy| policy.allows(&r.name)))
            .collect()
    }

    /// Clone every selected repository that has no folder under `clone_at`.
    #[tracing::instrument(skip(self, git, runtime, policy))]
    pub async fn clone_missing<G, R>(
        &self,
        git: &G,
        runtime: &R,
        clone_at: &Path,
        policy: Option<&ListingPolicy>,
    ) -> Result<Vec<Outcome<()>>>
    where
        G: Git + ?Sized,
        R: Runtime + ?Sized,
    {
        runtime.create_dir_all(clone_at)?;

        let jobs: Vec<_> = self
            .selected(policy)
            .into_iter()
            .filter_map(|repo| {
                let dest = clone_at.join(&repo.name);
                if runtime.exists(&dest) {
                    debug!("{} already cloned", repo.name);
                    return None;
                }
                let url = repo.clone_url();
                let job = async move {
                    info!("Cloning {} into {:?}", url, dest);
                    git.clone_repository(&url, &dest).await
                };
                Some((repo.name.clone(), job))
            })
            .collect();

        Ok(run_batched(jobs).await)
    }
}
