//! Construction of the network and process collaborators from configuration.
//!
//! Commands receive these as trait objects or generics so tests can swap in
//! mocks; only `main` calls the builders below.

use anyhow::Result;
use log::{debug, warn};
use reqwest::Client;

use crate::{
    config::Config,
    git::GitCli,
    http::{Auth, HttpClient},
    process::RealProcessRunner,
    provider::{GITHUB_API_URL, GitHubProvider},
    registry::VerdaccioClient,
};

const USER_AGENT: &str = "pkgdep-cli";

fn build_client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Build an HTTP client with optional bearer token
pub fn build_http_client(token: Option<&str>) -> Result<HttpClient> {
    let client = HttpClient::new(build_client()?);
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => {
            debug!("HTTP client configured with authentication");
            Ok(client.with_auth(Auth::Bearer(token.to_string())))
        }
        None => Ok(client),
    }
}

/// GitHub repository listing for the configured token.
pub fn build_provider(config: &Config, api_url: Option<&str>) -> Result<GitHubProvider> {
    if config.github_token.is_none() {
        warn!("No GitHub token configured, only public data is reachable");
    }
    let http_client = build_http_client(config.github_token.as_deref())?;
    Ok(GitHubProvider::from_http_client(
        http_client,
        api_url.unwrap_or(GITHUB_API_URL),
    ))
}

/// Registry client; fails with `RegistryError::MissingCredentials` when the
/// username or password is not configured.
pub fn build_registry(config: &Config) -> Result<VerdaccioClient> {
    let registry = VerdaccioClient::with_credentials(
        build_client()?,
        config.registry_url.as_deref(),
        config.registry_username.as_deref(),
        config.registry_password.as_deref(),
    )?;
    Ok(registry)
}

pub fn build_git() -> GitCli<RealProcessRunner> {
    GitCli::new(RealProcessRunner)
}
