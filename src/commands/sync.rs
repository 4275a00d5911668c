use anyhow::Result;
use log::info;

use crate::deploy::DeploymentReport;
use crate::git::Git;
use crate::process::ProcessRunner;
use crate::provider::RepositorySource;
use crate::registry::RegistryClient;
use crate::repository::RepositoryList;
use crate::runtime::Runtime;

use super::Context;
use super::deploy::{DeployMode, DeployOptions, deploy};
use super::repositories::update_local;

/// Refresh the repository list, bring every allowed checkout up to date,
/// then deploy whatever changed since the ledger was last written.
#[tracing::instrument(skip(ctx, git, source, runner))]
pub async fn sync<R, G, S, P>(
    ctx: &Context<R>,
    git: &G,
    source: &S,
    runner: &P,
) -> Result<DeploymentReport>
where
    R: Runtime,
    G: Git + ?Sized,
    S: RepositorySource + ?Sized,
    P: ProcessRunner + ?Sized,
{
    let list = RepositoryList::sync(&ctx.runtime, &ctx.app.repositories_file(), source).await?;
    info!("Repository list has {} entries", list.repositories.len());

    update_local(ctx, git, &list).await?;

    deploy(
        ctx,
        runner,
        None::<&dyn RegistryClient>,
        DeployOptions {
            mode: DeployMode::Incremental,
            ..Default::default()
        },
    )
    .await
}
