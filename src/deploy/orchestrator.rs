use anyhow::Result;
use log::{debug, error, info};
use std::path::PathBuf;

use super::{ChangeFilter, DeploymentLedger, DeploymentReport, DeploymentResult, VersionBaseline};
use crate::config::ListingPolicy;
use crate::graph::DependencyGraph;
use crate::package::{PackageCollection, PackageDescriptor};
use crate::package_manager::Operation;
use crate::process::ProcessRunner;
use crate::runtime::Runtime;

pub const NOTHING_TO_DEPLOY: &str = "All packages are up to date. Nothing to deploy.";

/// Runs install, build and publish for a planned list of packages, one at a
/// time, and records successes in the ledger.
pub struct Orchestrator<'a, P: ?Sized, R: ?Sized> {
    runner: &'a P,
    runtime: &'a R,
    collection: &'a PackageCollection,
    policy: &'a ListingPolicy,
    ledger: DeploymentLedger,
    ledger_path: PathBuf,
    result_path: Option<PathBuf>,
    ignore_apps: bool,
}

impl<'a, P, R> Orchestrator<'a, P, R>
where
    P: ProcessRunner + ?Sized,
    R: Runtime + ?Sized,
{
    pub fn new(
        runner: &'a P,
        runtime: &'a R,
        collection: &'a PackageCollection,
        policy: &'a ListingPolicy,
        ledger: DeploymentLedger,
        ledger_path: PathBuf,
    ) -> Self {
        Self {
            runner,
            runtime,
            collection,
            policy,
            ledger,
            ledger_path,
            result_path: None,
            ignore_apps: false,
        }
    }

    /// Also write every run's report as JSON to `path`.
    pub fn with_result_path(mut self, path: PathBuf) -> Self {
        self.result_path = Some(path);
        self
    }

    pub fn ignore_apps(mut self, ignore: bool) -> Self {
        self.ignore_apps = ignore;
        self
    }

    pub fn ledger(&self) -> &DeploymentLedger {
        &self.ledger
    }

    /// Every package, in build order.
    pub async fn deploy_all(&mut self) -> Result<DeploymentReport> {
        let plan = DependencyGraph::new(self.collection.packages()).build_order()?;
        self.execute(plan).await
    }

    /// Build order restricted by the listing policy.
    pub async fn deploy(&mut self) -> Result<DeploymentReport> {
        let plan = ChangeFilter::new(self.collection, &self.ledger, self.policy)
            .ignore_apps(self.ignore_apps)
            .filter_by_configuration()?;
        self.execute(plan).await
    }

    /// Only packages that changed since the ledger was last written, plus
    /// their dependents.
    pub async fn incremental_deployment(&mut self) -> Result<DeploymentReport> {
        let plan = ChangeFilter::new(self.collection, &self.ledger, self.policy)
            .ignore_apps(self.ignore_apps)
            .incremental_build_order()?;
        self.execute_incremental(plan).await
    }

    /// Like [`incremental_deployment`](Self::incremental_deployment) but
    /// compares against `baseline` (typically the registry) instead of the
    /// ledger.
    pub async fn incremental_deployment_against<B: VersionBaseline + ?Sized>(
        &mut self,
        baseline: &B,
    ) -> Result<DeploymentReport> {
        let plan = ChangeFilter::new(self.collection, baseline, self.policy)
            .ignore_apps(self.ignore_apps)
            .incremental_build_order()?;
        self.execute_incremental(plan).await
    }

    async fn execute_incremental(
        &mut self,
        plan: Vec<&'a PackageDescriptor>,
    ) -> Result<DeploymentReport> {
        if plan.is_empty() {
            info!("{}", NOTHING_TO_DEPLOY);
            return Ok(DeploymentReport::default());
        }
        self.execute(plan).await
    }

    async fn execute(&mut self, plan: Vec<&'a PackageDescriptor>) -> Result<DeploymentReport> {
        info!(
            "Packages to deploy in order: {:?}",
            plan.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
        );

        let mut report = DeploymentReport::default();
        for pkg in plan {
            match self.deploy_package(pkg).await {
                Ok(()) => {
                    info!("Package {} deployed", pkg.name);
                    self.ledger.record(&pkg.name, &pkg.version);
                    report.push(DeploymentResult::succeeded(pkg));
                }
                Err((step, e)) => {
                    error!("Package {} failed to be deployed at {}: {:#}", pkg.name, step, e);
                    report.push(DeploymentResult::failed(pkg, &step, &e));
                }
            }
        }

        if report.succeeded().next().is_some() {
            self.ledger.save(self.runtime, &self.ledger_path)?;
        } else {
            debug!("No package deployed, leaving ledger untouched");
        }

        if let Some(path) = &self.result_path {
            report.save(self.runtime, path)?;
        }

        Ok(report)
    }

    async fn deploy_package(
        &self,
        pkg: &PackageDescriptor,
    ) -> std::result::Result<(), (Operation, anyhow::Error)> {
        let mut steps = vec![Operation::Install { no_lockfile: true }, Operation::Build];
        if !pkg.is_private {
            steps.push(Operation::Publish);
        }

        for step in steps {
            debug!("{}: {} {}", pkg.name, pkg.manager, step);
            let args = pkg.manager.args(&step);
            if let Err(e) = self
                .runner
                .run(pkg.manager.program(), &args, &pkg.location)
                .await
            {
                return Err((step, e));
            }
        }
        Ok(())
    }
}
