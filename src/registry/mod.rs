//! Private npm registry access.
//!
//! The deployer only ever needs one thing from the registry: the latest
//! published version of every package, used as the baseline for incremental
//! deployment.

mod verdaccio;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use verdaccio::VerdaccioClient;

pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:4873";

/// A package as the registry reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePackage {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryClient: Send + Sync {
    fn url(&self) -> &str;

    /// Every package known to the registry, keyed by name.
    async fn get_all_packages(&self) -> Result<BTreeMap<String, RemotePackage>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Username or password is needed but not configured.
    MissingCredentials(&'static str),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::MissingCredentials(field) => write!(
                f,
                "Registry {} is not set, cannot do incremental build.",
                field
            ),
        }
    }
}

impl std::error::Error for RegistryError {}
