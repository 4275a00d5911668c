use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{DEFAULT_REGISTRY_URL, RegistryClient, RegistryError, RemotePackage};
use crate::http::{Auth, HttpClient};

/// Verdaccio's legacy `/-/all` search endpoint.
#[derive(Debug)]
pub struct VerdaccioClient {
    http_client: HttpClient,
    url: String,
}

impl VerdaccioClient {
    pub fn from_http_client(http_client: HttpClient, url: &str) -> Self {
        Self {
            http_client,
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Client authenticated with HTTP basic auth. Both credentials are
    /// required; `url` falls back to [`DEFAULT_REGISTRY_URL`].
    pub fn with_credentials(
        client: Client,
        url: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, RegistryError> {
        let username = non_empty(username).ok_or(RegistryError::MissingCredentials("username"))?;
        let password = non_empty(password).ok_or(RegistryError::MissingCredentials("password"))?;
        let url = non_empty(url).unwrap_or(DEFAULT_REGISTRY_URL);

        let http_client = HttpClient::new(client).with_auth(Auth::Basic {
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(Self::from_http_client(http_client, url))
    }

    fn all_url(&self) -> String {
        format!("{}/-/all", self.url)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `{ "_updated": 0, "<name>": { "name", "version" | "dist-tags" } }`
fn parse_all(body: BTreeMap<String, Value>) -> BTreeMap<String, RemotePackage> {
    let mut packages = BTreeMap::new();

    for (key, entry) in body {
        if key.starts_with('_') {
            continue;
        }

        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&key)
            .to_string();
        let version = entry.get("version").and_then(Value::as_str).or_else(|| {
            entry
                .get("dist-tags")
                .and_then(|tags| tags.get("latest"))
                .and_then(Value::as_str)
        });

        let Some(version) = version else {
            warn!("Registry entry '{}' has no version, ignoring it", key);
            continue;
        };

        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);

        packages.insert(
            name.clone(),
            RemotePackage {
                name,
                version: version.to_string(),
                description,
            },
        );
    }

    packages
}

#[async_trait]
impl RegistryClient for VerdaccioClient {
    fn url(&self) -> &str {
        &self.url
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_packages(&self) -> Result<BTreeMap<String, RemotePackage>> {
        let body: BTreeMap<String, Value> = self.http_client.get_json(&self.all_url()).await?;
        let packages = parse_all(body);
        debug!("Retrieved {} packages from {}", packages.len(), self.url);
        Ok(packages)
    }
}
