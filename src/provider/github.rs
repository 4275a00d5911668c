//! GitHub provider implementation.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};

use crate::http::HttpClient;

use super::{RepositoryInfo, RepositorySource};

/// Upper bound on pages fetched, 5000 repositories.
const MAX_PAGES: usize = 50;
const PER_PAGE: usize = 100;

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Repo {
        pub name: String,
        pub full_name: String,
        pub private: bool,
        pub description: Option<String>,
        pub html_url: String,
        pub language: Option<String>,
        pub updated_at: Option<String>,
        pub ssh_url: Option<String>,
    }
}

#[derive(Debug)]
pub struct GitHubProvider {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubProvider {
    /// `http_client` is expected to carry the bearer token.
    pub fn from_http_client(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_repos(&self) -> Result<Vec<api::Repo>> {
        let url = format!("{}/user/repos", self.api_url);
        let per_page = PER_PAGE.to_string();
        let mut repos = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!("Fetching repositories page {} from {}...", page, url);

            let page_str = page.to_string();
            let parsed: Vec<api::Repo> = self
                .http_client
                .get_json_with_query(
                    &url,
                    &[
                        ("visibility", "all"),
                        ("affiliation", "owner"),
                        ("per_page", &per_page),
                        ("page", &page_str),
                    ],
                )
                .await?;

            let last_page = parsed.len() < PER_PAGE;
            repos.extend(parsed);
            if last_page {
                return Ok(repos);
            }
        }

        warn!(
            "Stopped listing repositories after {} pages ({} repositories)",
            MAX_PAGES,
            repos.len()
        );
        Ok(repos)
    }
}

#[async_trait]
impl RepositorySource for GitHubProvider {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    #[tracing::instrument(skip(self))]
    async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>> {
        let repos = self.fetch_repos().await?;
        debug!("Fetched {} repositories", repos.len());
        Ok(repos.into_iter().map(RepositoryInfo::from).collect())
    }
}

impl From<api::Repo> for RepositoryInfo {
    fn from(r: api::Repo) -> Self {
        RepositoryInfo {
            name: r.name,
            full_name: r.full_name,
            private: r.private,
            description: r.description,
            url: r.html_url,
            language: r.language,
            updated_at: r.updated_at,
            ssh_url: r.ssh_url,
        }
    }
}
