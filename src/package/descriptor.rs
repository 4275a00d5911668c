use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::Manifest;
use crate::package_manager::PackageManagerKind;

/// One local package, as discovered on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    /// `dependencies` and `devDependencies` merged; peer dependencies ignored.
    pub dependencies: BTreeMap<String, String>,
    pub is_private: bool,
    /// Last path component of the package directory.
    pub folder_name: String,
    pub location: PathBuf,
    pub manager: PackageManagerKind,
}

impl PackageDescriptor {
    /// Descriptor rooted at `./<last name segment>` with no dependencies.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let folder_name = name.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            location: PathBuf::from(&folder_name),
            folder_name,
            name,
            version: version.into(),
            dependencies: BTreeMap::new(),
            is_private: false,
            manager: PackageManagerKind::default(),
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }

    pub fn with_folder(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = folder_name.into();
        self.location = PathBuf::from(&self.folder_name);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Build a descriptor from a parsed manifest. Manifests without a name
    /// are skipped.
    pub fn from_manifest(
        location: &Path,
        manifest: Manifest,
        manager: PackageManagerKind,
    ) -> Option<Self> {
        let name = match manifest.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("Skipping package at {:?}: manifest has no name", location);
                return None;
            }
        };

        let dependencies = manifest.merged_dependencies();
        let folder_name = location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(Self {
            name,
            version: manifest.version.unwrap_or_default(),
            dependencies,
            is_private: manifest.private,
            folder_name,
            location: location.to_path_buf(),
            manager,
        })
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    pub fn parsed_version(&self) -> Option<semver::Version> {
        semver::Version::parse(self.version.trim()).ok()
    }
}
