//! Application folder and deployer configuration.
//!
//! Configuration is loaded once per invocation and passed down explicitly.

mod app_folder;
mod listing;

pub use app_folder::{
    APP_FOLDER_NAME, AppFolder, CONFIG_FILE, GLOBAL_CONFIGURATION_FILE, REPOSITORIES_FILE,
};
pub use listing::{ListingMode, ListingPolicy};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::runtime::{Runtime, write_atomic};

/// `deployer-config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages_path: Option<PathBuf>,
    #[serde(default)]
    pub repositories_listing: ListingPolicy,
    /// Package names never scanned into the collection.
    #[serde(default)]
    pub packages_blacklist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_profile_url: Option<String>,
}

/// Environment variables that take precedence over the file.
const ENV_OVERRIDES: &[&str] = &[
    "GITHUB_TOKEN",
    "PACKAGES_PATH",
    "REGISTRY_URL",
    "REGISTRY_USERNAME",
    "REGISTRY_PASSWORD",
];

impl Config {
    pub fn default_for(app: &AppFolder) -> Self {
        Self {
            app_path: Some(app.root().to_path_buf()),
            packages_path: Some(app.repos()),
            ..Default::default()
        }
    }

    /// Load the configuration file, writing the default one first when it
    /// does not exist.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, app: &AppFolder) -> Result<Self> {
        let path = app.config_file();
        if !runtime.exists(&path) {
            info!("No configuration at {:?}, writing defaults", path);
            let config = Self::default_for(app);
            config.save(runtime, app)?;
            return Ok(config);
        }

        let content = runtime.read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Self::default_for(app));
        }
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn save<R: Runtime + ?Sized>(&self, runtime: &R, app: &AppFolder) -> Result<()> {
        let path = app.config_file();
        runtime.create_dir_all(&app.configuration())?;
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        write_atomic(runtime, &path, yaml.as_bytes())
            .with_context(|| format!("Failed to save configuration {:?}", path))
    }

    /// Copy of `self` with values from the environment applied on top.
    pub fn with_env_overrides<R: Runtime + ?Sized>(mut self, runtime: &R) -> Self {
        for key in ENV_OVERRIDES {
            let Ok(value) = runtime.env_var(key) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            debug!("Using {} from the environment", key);
            match *key {
                "GITHUB_TOKEN" => self.github_token = Some(value),
                "PACKAGES_PATH" => self.packages_path = Some(PathBuf::from(value)),
                "REGISTRY_URL" => self.registry_url = Some(value),
                "REGISTRY_USERNAME" => self.registry_username = Some(value),
                "REGISTRY_PASSWORD" => self.registry_password = Some(value),
                _ => {}
            }
        }
        self
    }

    pub fn packages_path(&self, app: &AppFolder) -> PathBuf {
        self.packages_path.clone().unwrap_or_else(|| app.repos())
    }

    /// Keep credentials out of `config show`.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        Self {
            registry_password: mask(&self.registry_password),
            github_token: mask(&self.github_token),
            ..self.clone()
        }
    }
}
