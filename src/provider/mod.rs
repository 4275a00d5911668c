//! Remote repository listing.
//!
//! A [`RepositorySource`] answers "which repositories does this account
//! own". GitHub is the only implementation.

mod github;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use github::GitHubProvider;

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Repository metadata as stored in `repositories.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Web page of the repository.
    pub url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_url: Option<String>,
}

impl RepositoryInfo {
    /// SSH URL when known, otherwise the web URL with `.git` appended.
    pub fn clone_url(&self) -> String {
        match &self.ssh_url {
            Some(ssh) => ssh.clone(),
            None => format!("{}.git", self.url.trim_end_matches('/')),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositorySource: Send + Sync {
    fn api_url(&self) -> &str;

    /// Every repository owned by the authenticated user.
    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(ssh_url: Option<&str>) -> RepositoryInfo {
        RepositoryInfo {
            name: "core".into(),
            full_name: "me/core".into(),
            private: false,
            description: None,
            url: "https://github.com/me/core".into(),
            language: Some("TypeScript".into()),
            updated_at: None,
            ssh_url: ssh_url.map(String::from),
        }
    }

    #[test]
    fn test_clone_url() {
        assert_eq!(
            info(Some("git@github.com:me/core.git")).clone_url(),
            "git@github.com:me/core.git"
        );
        assert_eq!(info(None).clone_url(), "https://github.com/me/core.git");
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(info(None)).unwrap();
        assert_eq!(value["fullName"], "me/core");
        assert!(value.get("sshUrl").is_none());
        assert!(value.get("updatedAt").is_some());
    }
}
