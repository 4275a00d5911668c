use anyhow::Result;
use log::debug;

use crate::git::Git;
use crate::package::PackageDescriptor;
use crate::package_manager::{NODE_MODULES, NPM_LOCKFILE, Operation, PackageManagerKind};
use crate::process::ProcessRunner;
use crate::repository::run_batched;
use crate::runtime::Runtime;

use super::Context;

/// Move every npm package to pnpm: drop `node_modules` and
/// `package-lock.json`, then `pnpm install`.
#[tracing::instrument(skip(ctx, runner))]
pub async fn switch<R, P>(ctx: &Context<R>, runner: &P) -> Result<()>
where
    R: Runtime,
    P: ProcessRunner + ?Sized,
{
    let collection = ctx.scan()?;
    let runtime = &ctx.runtime;
    let pnpm = PackageManagerKind::Pnpm;
    let install = pnpm.args(&Operation::Install { no_lockfile: false });

    let jobs: Vec<_> = collection
        .packages()
        .iter()
        .filter(|pkg| {
            PackageManagerKind::detect(runtime, &[pkg.location.as_path()]) == PackageManagerKind::Npm
        })
        .map(|pkg| {
            let install = &install;
            let job = async move {
                println!("Switching {} to pnpm...", pkg.name);
                remove_node_modules(runtime, pkg);
                let lockfile = pkg.location.join(NPM_LOCKFILE);
                if let Err(e) = runtime.remove_file(&lockfile) {
                    debug!("Could not delete {:?}: {:#}", lockfile, e);
                }
                runner.run(pnpm.program(), install, &pkg.location).await
            };
            (pkg.name.clone(), job)
        })
        .collect();

    if jobs.is_empty() {
        println!("No npm packages to switch.");
        return Ok(());
    }

    for outcome in run_batched(jobs).await {
        match outcome.result {
            Ok(()) => println!("Successfully migrated {}", outcome.name),
            Err(e) => println!("Failed to migrate {}: {:#}", outcome.name, e),
        }
    }
    Ok(())
}

/// Undo an uncommitted [`switch`]: for every pnpm package, drop
/// `node_modules` and discard working tree changes.
#[tracing::instrument(skip(ctx, git))]
pub async fn revert_switch<R, G>(ctx: &Context<R>, git: &G) -> Result<()>
where
    R: Runtime,
    G: Git + ?Sized,
{
    let collection = ctx.scan()?;
    let runtime = &ctx.runtime;

    let jobs: Vec<_> = collection
        .packages()
        .iter()
        .filter(|pkg| {
            PackageManagerKind::detect(runtime, &[pkg.location.as_path()]) == PackageManagerKind::Pnpm
        })
        .map(|pkg| (pkg.name.clone(), revert_package(runtime, git, pkg)))
        .collect();

    for outcome in run_batched(jobs).await {
        match outcome.result {
            Ok(true) => println!("Successfully reverted {}", outcome.name),
            Ok(false) => println!("No changes found in {}. Skipping.", outcome.name),
            Err(e) => println!("Failed to revert {}: {:#}", outcome.name, e),
        }
    }
    Ok(())
}

/// `true` when changes were discarded, `false` when the tree was clean.
async fn revert_package<R, G>(runtime: &R, git: &G, pkg: &PackageDescriptor) -> Result<bool>
where
    R: Runtime + ?Sized,
    G: Git + ?Sized,
{
    println!("Reverting changes to package {}...", pkg.name);
    remove_node_modules(runtime, pkg);
    if git.is_clean(&pkg.location).await? {
        return Ok(false);
    }
    git.discard_changes(&pkg.location).await?;
    Ok(true)
}

fn remove_node_modules<R: Runtime + ?Sized>(runtime: &R, pkg: &PackageDescriptor) {
    let node_modules = pkg.location.join(NODE_MODULES);
    if runtime.exists(&node_modules)
        && let Err(e) = runtime.remove_dir_all(&node_modules)
    {
        debug!("Could not delete {:?}: {:#}", node_modules, e);
    }
}
