use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::config::{AppFolder, Config};
use crate::deploy::DeploymentLedger;
use crate::package::PackageCollection;
use crate::runtime::Runtime;

/// Everything a command needs that comes from the app folder.
pub struct Context<R: Runtime> {
    pub runtime: R,
    pub app: AppFolder,
    /// File configuration with environment overrides applied.
    pub config: Config,
}

impl<R: Runtime> Context<R> {
    #[tracing::instrument(skip(runtime))]
    pub fn load(runtime: R, app_path: Option<PathBuf>) -> Result<Self> {
        let app = AppFolder::resolve(&runtime, app_path)?;
        app.ensure(&runtime)?;
        let config = Config::load(&runtime, &app)?.with_env_overrides(&runtime);
        debug!("Using app folder {:?}", app.root());
        Ok(Self {
            runtime,
            app,
            config,
        })
    }

    pub fn packages_path(&self) -> PathBuf {
        self.config.packages_path(&self.app)
    }

    /// Local packages, minus the names in `packagesBlacklist`.
    pub fn scan(&self) -> Result<PackageCollection> {
        let collection = PackageCollection::scan(&self.runtime, &self.packages_path())?;
        Ok(collection.without_names(&self.config.packages_blacklist))
    }

    pub fn ledger(&self) -> Result<DeploymentLedger> {
        DeploymentLedger::load(&self.runtime, &self.app.ledger_file())
    }

    /// Apply `change` to the configuration file and save it. Environment
    /// overrides are never written back.
    pub fn update_config(&mut self, change: impl Fn(&mut Config)) -> Result<()> {
        let mut on_disk = Config::load(&self.runtime, &self.app)?;
        change(&mut on_disk);
        on_disk.save(&self.runtime, &self.app)?;
        change(&mut self.config);
        Ok(())
    }
}
