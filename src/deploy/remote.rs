use anyhow::Result;
use log::info;
use std::collections::{BTreeMap, HashSet};

use super::VersionBaseline;
use crate::package::PackageCollection;
use crate::registry::{RegistryClient, RemotePackage};

/// Published versions of the local packages, as the registry sees them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    packages: BTreeMap<String, RemotePackage>,
}

impl RemoteSnapshot {
    /// Fetch everything from the registry and keep only names that exist
    /// locally.
    #[tracing::instrument(skip_all)]
    pub async fn fetch<C: RegistryClient + ?Sized>(
        client: &C,
        local: &PackageCollection,
    ) -> Result<Self> {
        let all = client.get_all_packages().await?;
        let total = all.len();
        let snapshot = Self::narrowed(all, local);
        info!(
            "Registry {} has {} packages, {} of them local",
            client.url(),
            total,
            snapshot.len()
        );
        Ok(snapshot)
    }

    pub fn narrowed(all: BTreeMap<String, RemotePackage>, local: &PackageCollection) -> Self {
        let names: HashSet<&str> = local.names().into_iter().collect();
        Self {
            packages: all
                .into_iter()
                .filter(|(name, _)| names.contains(name.as_str()))
                .collect(),
        }
    }

    pub fn packages(&self) -> &BTreeMap<String, RemotePackage> {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl VersionBaseline for RemoteSnapshot {
    fn deployed_version(&self, name: &str) -> Option<&str> {
        self.packages.get(name).map(|p| p.version.as_str())
    }
}
