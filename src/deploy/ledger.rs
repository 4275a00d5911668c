use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::VersionBaseline;
use crate::runtime::{Runtime, write_atomic};

pub const LEDGER_FILE: &str = "packageDeploymentState.yaml";

/// Last successfully deployed version of each package, persisted as a flat
/// YAML map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentLedger {
    entries: BTreeMap<String, String>,
}

impl DeploymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger, or an empty one when the file does not exist yet.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No deployment ledger at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let content = runtime.read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse deployment ledger {:?}", path))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime + ?Sized>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !runtime.exists(parent)
        {
            runtime.create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(&self.entries)
            .context("Failed to serialize deployment ledger")?;
        write_atomic(runtime, path, yaml.as_bytes())
            .with_context(|| format!("Failed to save deployment ledger {:?}", path))
    }

    pub fn record(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.entries.insert(name.into(), version.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VersionBaseline for DeploymentLedger {
    fn deployed_version(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DeploymentLedger {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::path::PathBuf;

    #[test]
    fn test_load_missing_file_is_empty() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let ledger = DeploymentLedger::load(&runtime, Path::new("/app/state.yaml")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_load_empty_file_is_empty() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("\n".to_string()));

        let ledger = DeploymentLedger::load(&runtime, Path::new("/app/state.yaml")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("- not\n- a map\n".to_string()));

        let err = DeploymentLedger::load(&runtime, Path::new("/app/state.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse deployment ledger"));
    }

    #[test]
    fn test_save_and_reload_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration").join(LEDGER_FILE);

        let mut ledger = DeploymentLedger::new();
        ledger.record("@scope/lib", "1.0.0");
        ledger.record("@scope/core", "1.0.1");
        ledger.save(&RealRuntime, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let core = content.find("@scope/core").unwrap();
        let lib = content.find("@scope/lib").unwrap();
        assert!(core < lib, "entries must be sorted:\n{}", content);
        assert!(!path.with_file_name(format!(".{}.tmp", LEDGER_FILE)).exists());

        let reloaded = DeploymentLedger::load(&RealRuntime, &path).unwrap();
        assert_eq!(reloaded, ledger);
        assert_eq!(reloaded.deployed_version("@scope/core"), Some("1.0.1"));
        assert_eq!(reloaded.deployed_version("@scope/app"), None);
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join(LEDGER_FILE);
        std::fs::write(&path, "core: 0.9.0\n").unwrap();

        let mut ledger = DeploymentLedger::load(&RealRuntime, &path).unwrap();
        ledger.record("core", "1.0.0");
        ledger.save(&RealRuntime, &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "core: 1.0.0\n");
    }
}
