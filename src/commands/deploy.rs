use anyhow::{Result, bail};
use log::debug;

use crate::deploy::{DeploymentReport, NOTHING_TO_DEPLOY, Orchestrator, RemoteSnapshot};
use crate::process::ProcessRunner;
use crate::registry::RegistryClient;
use crate::runtime::Runtime;

use super::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    /// Every package, no filtering.
    All,
    /// Packages allowed by the listing policy.
    #[default]
    Filtered,
    /// Packages that changed since the last deployment, plus dependents.
    Incremental,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    pub mode: DeployMode,
    pub ignore_apps: bool,
    /// Compare against the registry instead of the ledger.
    pub use_remote: bool,
}

/// Scan, plan, and run the deployment. `registry` is only consulted for an
/// incremental run with `use_remote`.
#[tracing::instrument(skip(ctx, runner, registry))]
pub async fn deploy<R, P, C>(
    ctx: &Context<R>,
    runner: &P,
    registry: Option<&C>,
    options: DeployOptions,
) -> Result<DeploymentReport>
where
    R: Runtime,
    P: ProcessRunner + ?Sized,
    C: RegistryClient + ?Sized,
{
    if options.mode == DeployMode::Incremental && options.use_remote && registry.is_none() {
        bail!("No registry client configured, cannot do incremental build against the registry.");
    }

    let collection = ctx.scan()?;
    debug!("Scanned {} packages", collection.len());

    let mut orchestrator = Orchestrator::new(
        runner,
        &ctx.runtime,
        &collection,
        &ctx.config.repositories_listing,
        ctx.ledger()?,
        ctx.app.ledger_file(),
    )
    .with_result_path(ctx.app.deployment_result_file())
    .ignore_apps(options.ignore_apps);

    let report = match (options.mode, registry) {
        (DeployMode::All, _) => orchestrator.deploy_all().await?,
        (DeployMode::Filtered, _) => orchestrator.deploy().await?,
        (DeployMode::Incremental, Some(registry)) if options.use_remote => {
            let snapshot = RemoteSnapshot::fetch(registry, &collection).await?;
            orchestrator.incremental_deployment_against(&snapshot).await?
        }
        (DeployMode::Incremental, _) => orchestrator.incremental_deployment().await?,
    };

    print_report(&report, options.mode);
    Ok(report)
}

fn print_report(report: &DeploymentReport, mode: DeployMode) {
    if report.is_empty() {
        if mode == DeployMode::Incremental {
            println!("{}", NOTHING_TO_DEPLOY);
        } else {
            println!("No packages to deploy.");
        }
        return;
    }

    for result in report.results() {
        if result.success {
            println!("  deployed {}@{}", result.package_name, result.version);
        } else {
            println!(
                "  FAILED   {}@{} at {}: {}",
                result.package_name,
                result.version,
                result.failed_step.as_deref().unwrap_or("?"),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!(
        "{} deployed, {} failed",
        report.succeeded().count(),
        report.failed().count()
    );
}
