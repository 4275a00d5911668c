use anyhow::Result;
use log::info;

use crate::config::{ListingMode, ListingPolicy};
use crate::git::Git;
use crate::provider::RepositorySource;
use crate::repository::{LocalRepositories, Outcome, RepositoryList, delete_listed};
use crate::runtime::Runtime;

use super::Context;

/// Make `mode` the active listing.
pub fn select<R: Runtime>(ctx: &mut Context<R>, mode: ListingMode) -> Result<()> {
    ctx.update_config(|c| c.repositories_listing.mode = mode)?;
    println!("Using the {}", mode);
    Ok(())
}

pub fn whitelist_add<R: Runtime>(ctx: &mut Context<R>, names: &[String]) -> Result<()> {
    let added = ctx
        .config
        .repositories_listing
        .clone()
        .add_to_whitelist(names);
    ctx.update_config(|c| {
        c.repositories_listing.add_to_whitelist(names);
    })?;
    report_added("whitelist", &added);
    Ok(())
}

pub fn blacklist_add<R: Runtime>(ctx: &mut Context<R>, names: &[String]) -> Result<()> {
    let added = ctx
        .config
        .repositories_listing
        .clone()
        .add_to_blacklist(names);
    ctx.update_config(|c| {
        c.repositories_listing.add_to_blacklist(names);
    })?;
    report_added("blacklist", &added);
    Ok(())
}

fn report_added(list: &str, added: &[String]) {
    if added.is_empty() {
        println!("Nothing added to the {}.", list);
    } else {
        println!("Added to the {}: {}", list, added.join(", "));
    }
}

/// Remove local checkouts of blacklisted repositories.
#[tracing::instrument(skip(ctx))]
pub fn delete_blacklisted<R: Runtime>(ctx: &Context<R>) -> Result<()> {
    let deleted = delete_listed(
        &ctx.runtime,
        &ctx.packages_path(),
        &ctx.config.repositories_listing.blacklist,
    )?;
    if deleted.is_empty() {
        println!("No blacklisted repositories found locally.");
    }
    for path in deleted {
        println!("Deleted {}", path.display());
    }
    Ok(())
}

/// Clone repositories from the saved (or freshly fetched) list that are not
/// on disk yet.
#[tracing::instrument(skip(ctx, git, source))]
pub async fn clone<R, G, S>(ctx: &Context<R>, git: &G, source: &S, use_whitelist: bool) -> Result<()>
where
    R: Runtime,
    G: Git + ?Sized,
    S: RepositorySource + ?Sized,
{
    let path = ctx.app.repositories_file();
    let list = RepositoryList::load_or_fetch(&ctx.runtime, &path, source).await?;
    list.save(&ctx.runtime, &path)?;

    let whitelist = ListingPolicy::whitelist(ctx.config.repositories_listing.whitelist.clone());
    let policy = use_whitelist.then_some(&whitelist);
    let outcomes = list
        .clone_missing(git, &ctx.runtime, &ctx.packages_path(), policy)
        .await?;
    print_outcomes("Cloned", &outcomes, |_| None);
    Ok(())
}

#[tracing::instrument(skip(ctx, git))]
pub async fn pull<R: Runtime, G: Git + ?Sized>(ctx: &Context<R>, git: &G) -> Result<()> {
    let local = LocalRepositories::scan(&ctx.runtime, &ctx.packages_path())?;
    let outcomes = local.pull(git).await;
    print_outcomes("Pulled", &outcomes, |pulled| {
        (!pulled).then_some("has no remote".to_string())
    });
    Ok(())
}

#[tracing::instrument(skip(ctx, git))]
pub async fn push<R: Runtime, G: Git + ?Sized>(ctx: &Context<R>, git: &G) -> Result<()> {
    let local = LocalRepositories::scan(&ctx.runtime, &ctx.packages_path())?;
    let outcomes = local.push(git).await;
    print_outcomes("Pushed", &outcomes, |_| None);
    Ok(())
}

/// Optionally refresh the repository list, clone what is missing, then pull
/// or push every allowed checkout by commit date.
#[tracing::instrument(skip(ctx, git, source))]
pub async fn update<R, G, S>(ctx: &Context<R>, git: &G, source: &S, sync_info: bool) -> Result<()>
where
    R: Runtime,
    G: Git + ?Sized,
    S: RepositorySource + ?Sized,
{
    let path = ctx.app.repositories_file();
    let list = if sync_info {
        RepositoryList::sync(&ctx.runtime, &path, source).await?
    } else {
        let list = RepositoryList::load_or_fetch(&ctx.runtime, &path, source).await?;
        list.save(&ctx.runtime, &path)?;
        list
    };

    update_local(ctx, git, &list).await
}

pub(crate) async fn update_local<R, G>(ctx: &Context<R>, git: &G, list: &RepositoryList) -> Result<()>
where
    R: Runtime,
    G: Git + ?Sized,
{
    let policy = &ctx.config.repositories_listing;
    let packages_path = ctx.packages_path();

    let cloned = list
        .clone_missing(git, &ctx.runtime, &packages_path, Some(policy))
        .await?;
    print_outcomes("Cloned", &cloned, |_| None);

    let local = LocalRepositories::scan(&ctx.runtime, &packages_path)?.filter_by_policy(policy);
    info!("Updating {} local repositories", local.len());
    let updated = local.update(git).await;
    print_outcomes("Updated", &updated, |direction| Some(direction.to_string()));
    Ok(())
}

/// One line per outcome; `detail` adds a note to successful ones.
fn print_outcomes<T>(verb: &str, outcomes: &[Outcome<T>], detail: impl Fn(&T) -> Option<String>) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(value) => match detail(value) {
                Some(note) => println!("{} {}: {}", verb, outcome.name, note),
                None => println!("{} {}", verb, outcome.name),
            },
            Err(e) => println!("Error on {}: {:#}", outcome.name, e),
        }
    }
}
