use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use super::Git;
use crate::process::{ProcessError, ProcessRunner};

/// [`Git`] over the `git` executable.
pub struct GitCli<P> {
    runner: P,
}

impl<P: ProcessRunner> GitCli<P> {
    pub fn new(runner: P) -> Self {
        Self { runner }
    }

    async fn git(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.output("git", &args, repo).await
    }

    /// Like [`git`](Self::git), but a non-zero exit yields `None`.
    async fn git_optional(&self, repo: &Path, args: &[&str]) -> Result<Option<String>> {
        match self.git(repo, args).await {
            Ok(out) => Ok(Some(out)),
            Err(e) if e.downcast_ref::<ProcessError>().is_some() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn parse_timestamp(output: Option<String>) -> Result<Option<i64>> {
    match output.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(ts) => ts
            .parse()
            .map(Some)
            .with_context(|| format!("Unexpected commit timestamp '{}'", ts)),
    }
}

#[async_trait]
impl<P: ProcessRunner> Git for GitCli<P> {
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<()> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        let args = vec![
            "clone".to_string(),
            url.to_string(),
            dest.to_string_lossy().into_owned(),
        ];
        self.runner.run("git", &args, parent).await
    }

    async fn fetch(&self, repo: &Path) -> Result<()> {
        self.git(repo, &["fetch"]).await.map(|_| ())
    }

    async fn pull(&self, repo: &Path) -> Result<()> {
        self.git(repo, &["pull"]).await.map(|_| ())
    }

    async fn push(&self, repo: &Path) -> Result<()> {
        self.git(repo, &["push"]).await.map(|_| ())
    }

    async fn remote_url(&self, repo: &Path) -> Result<Option<String>> {
        Ok(self
            .git_optional(repo, &["remote", "get-url", "origin"])
            .await?
            .filter(|url| !url.is_empty()))
    }

    async fn head_commit_time(&self, repo: &Path) -> Result<Option<i64>> {
        parse_timestamp(self.git_optional(repo, &["log", "-1", "--format=%ct"]).await?)
    }

    async fn upstream_commit_time(&self, repo: &Path) -> Result<Option<i64>> {
        parse_timestamp(
            self.git_optional(repo, &["log", "-1", "--format=%ct", "@{u}"])
                .await?,
        )
    }

    async fn is_clean(&self, dir: &Path) -> Result<bool> {
        let status = self.git(dir, &["status", "--porcelain", "--", "."]).await?;
        Ok(status.trim().is_empty())
    }

    async fn discard_changes(&self, dir: &Path) -> Result<()> {
        self.git(dir, &["checkout", "--", "."]).await?;
        self.git(dir, &["clean", "-fd", "--", "."]).await?;
        Ok(())
    }
}
