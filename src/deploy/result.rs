use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::package::PackageDescriptor;
use crate::package_manager::Operation;
use crate::runtime::{Runtime, write_atomic};

pub const DEPLOYMENT_RESULT_FILE: &str = "deploymentResult.json";

/// Outcome of install/build/publish for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub package_name: String,
    pub folder_name: String,
    pub version: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentResult {
    pub fn succeeded(pkg: &PackageDescriptor) -> Self {
        Self {
            package_name: pkg.name.clone(),
            folder_name: pkg.folder_name.clone(),
            version: pkg.version.clone(),
            success: true,
            failed_step: None,
            error: None,
        }
    }

    pub fn failed(pkg: &PackageDescriptor, step: &Operation, error: &anyhow::Error) -> Self {
        Self {
            success: false,
            failed_step: Some(step.to_string()),
            error: Some(format!("{:#}", error)),
            ..Self::succeeded(pkg)
        }
    }
}

/// Every result of one deployment run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentReport {
    results: Vec<DeploymentResult>,
}

impl DeploymentReport {
    pub fn new(results: Vec<DeploymentResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[DeploymentResult] {
        &self.results
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &DeploymentResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeploymentResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub(crate) fn push(&mut self, result: DeploymentResult) {
        self.results.push(result);
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime + ?Sized>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !runtime.exists(parent)
        {
            runtime.create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(runtime, path, json.as_bytes())
            .with_context(|| format!("Failed to save deployment result {:?}", path))
    }
}
