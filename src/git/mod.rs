//! Git operations on local repositories.
//!
//! Only what syncing a workspace needs: clone, fetch, pull, push and the
//! commit timestamps used to decide between pulling and pushing. Reverting a
//! package-manager switch also needs the working tree status.

mod cli;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::fmt;
use std::path::Path;

pub use cli::GitCli;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Git: Send + Sync {
    /// Clone `url` into `dest`, which must not exist yet.
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<()>;

    async fn fetch(&self, repo: &Path) -> Result<()>;

    async fn pull(&self, repo: &Path) -> Result<()>;

    async fn push(&self, repo: &Path) -> Result<()>;

    /// URL of `origin`, `None` when there is no such remote.
    async fn remote_url(&self, repo: &Path) -> Result<Option<String>>;

    /// Commit time of `HEAD` in unix seconds, `None` on an empty repository.
    async fn head_commit_time(&self, repo: &Path) -> Result<Option<i64>>;

    /// Commit time of the upstream branch, `None` when no upstream is set.
    async fn upstream_commit_time(&self, repo: &Path) -> Result<Option<i64>>;

    /// `true` when `dir` has no modified or untracked files.
    async fn is_clean(&self, dir: &Path) -> Result<bool>;

    /// Restore tracked files under `dir` and delete untracked ones.
    async fn discard_changes(&self, dir: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Pull,
    Push,
    UpToDate,
}

impl SyncDirection {
    /// Newer side wins. Without an upstream there is nothing to pull from,
    /// so local work is pushed.
    pub fn decide(local: Option<i64>, upstream: Option<i64>) -> Self {
        match (local, upstream) {
            (_, None) => SyncDirection::Push,
            (None, Some(_)) => SyncDirection::Pull,
            (Some(local), Some(upstream)) if upstream > local => SyncDirection::Pull,
            (Some(local), Some(upstream)) if local > upstream => SyncDirection::Push,
            _ => SyncDirection::UpToDate,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Pull => f.write_str("pulled"),
            SyncDirection::Push => f.write_str("pushed"),
            SyncDirection::UpToDate => f.write_str("up to date"),
        }
    }
}

/// Fetch, compare commit times with the upstream, then pull or push.
#[tracing::instrument(skip(git))]
pub async fn sync_repository<G: Git + ?Sized>(git: &G, repo: &Path) -> Result<SyncDirection> {
    git.fetch(repo).await?;
    let local = git.head_commit_time(repo).await?;
    let upstream = git.upstream_commit_time(repo).await?;

    let direction = SyncDirection::decide(local, upstream);
    match direction {
        SyncDirection::Pull => git.pull(repo).await?,
        SyncDirection::Push => git.push(repo).await?,
        SyncDirection::UpToDate => {}
    }
    info!("{:?}: {}", repo, direction);
    Ok(direction)
}
