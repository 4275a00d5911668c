use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::deploy::{DEPLOYMENT_RESULT_FILE, LEDGER_FILE};
use crate::runtime::{Runtime, write_atomic};

pub const APP_FOLDER_NAME: &str = "perseverancia";
pub const GLOBAL_CONFIGURATION_FILE: &str = "globalConfiguration.yaml";
pub const CONFIG_FILE: &str = "deployer-config.yaml";
pub const REPOSITORIES_FILE: &str = "repositories.json";

/// Pointer from the fixed home location to a relocated app folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalConfiguration {
    app_path: PathBuf,
}

/// Layout of the application folder.
///
/// ```text
/// <root>/repos            cloned repositories (default packages path)
/// <root>/monorepo
/// <root>/configuration    deployer-config.yaml, ledger, repositories.json
/// <root>/data             deploymentResult.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFolder {
    root: PathBuf,
}

impl AppFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `explicit` when given, else the path recorded in
    /// `<home>/perseverancia/globalConfiguration.yaml`, else
    /// `<home>/perseverancia`.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime + ?Sized>(runtime: &R, explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = explicit {
            return Ok(Self::new(root));
        }

        let default_root = Self::default_root(runtime)?;
        let global = default_root.join(GLOBAL_CONFIGURATION_FILE);
        if runtime.exists(&global) {
            let content = runtime.read_to_string(&global)?;
            let parsed: GlobalConfiguration = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", global))?;
            debug!("App folder relocated to {:?}", parsed.app_path);
            return Ok(Self::new(parsed.app_path));
        }

        Ok(Self::new(default_root))
    }

    pub fn default_root<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
        let home = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home.join(APP_FOLDER_NAME))
    }

    /// Record `self` as the app folder future invocations resolve to.
    pub fn save_as_global<R: Runtime + ?Sized>(&self, runtime: &R) -> Result<()> {
        let default_root = Self::default_root(runtime)?;
        runtime.create_dir_all(&default_root)?;

        let yaml = serde_yaml::to_string(&GlobalConfiguration {
            app_path: self.root.clone(),
        })?;
        write_atomic(runtime, &default_root.join(GLOBAL_CONFIGURATION_FILE), yaml.as_bytes())?;
        info!("App folder set to {:?}", self.root);
        Ok(())
    }

    /// Create the folder and its subfolders if missing.
    pub fn ensure<R: Runtime + ?Sized>(&self, runtime: &R) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.repos(),
            self.monorepo(),
            self.configuration(),
            self.data(),
        ] {
            if !runtime.is_dir(&dir) {
                runtime.create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repos(&self) -> PathBuf {
        self.root.join("repos")
    }

    pub fn monorepo(&self) -> PathBuf {
        self.root.join("monorepo")
    }

    pub fn configuration(&self) -> PathBuf {
        self.root.join("configuration")
    }

    pub fn data(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn config_file(&self) -> PathBuf {
        self.configuration().join(CONFIG_FILE)
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.configuration().join(LEDGER_FILE)
    }

    pub fn repositories_file(&self) -> PathBuf {
        self.configuration().join(REPOSITORIES_FILE)
    }

    pub fn deployment_result_file(&self) -> PathBuf {
        self.data().join(DEPLOYMENT_RESULT_FILE)
    }
}
