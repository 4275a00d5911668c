use anyhow::{Context as _, Result};

use crate::deploy::{ChangeFilter, RemoteSnapshot};
use crate::graph::DependencyGraph;
use crate::package::{PackageCollection, PackageDescriptor};
use crate::provider::RepositorySource;
use crate::registry::RegistryClient;
use crate::runtime::Runtime;

use super::Context;

/// Which sections `print` writes, in this order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    pub configuration: bool,
    pub packages: bool,
    pub build_order: bool,
    pub incremental_build_packages: bool,
    pub remote_packages: bool,
    pub user_repositories: bool,
}

impl PrintOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `registry` and `source` are only used by the sections that need them.
#[tracing::instrument(skip(ctx, registry, source))]
pub async fn print<R, C, S>(
    ctx: &Context<R>,
    options: PrintOptions,
    registry: Option<&C>,
    source: Option<&S>,
) -> Result<()>
where
    R: Runtime,
    C: RegistryClient + ?Sized,
    S: RepositorySource + ?Sized,
{
    if options.is_empty() {
        println!("Nothing to print, see --help.");
        return Ok(());
    }

    if options.configuration {
        super::config::show(ctx)?;
    }

    let needs_packages = options.packages
        || options.build_order
        || options.incremental_build_packages
        || options.remote_packages;
    let collection = if needs_packages {
        ctx.scan()?
    } else {
        PackageCollection::default()
    };

    if options.packages {
        println!("Packages ({}):", collection.len());
        for line in package_lines(&collection) {
            println!("  {}", line);
        }
    }

    if options.build_order {
        println!("Build order:");
        for line in numbered(&DependencyGraph::new(collection.packages()).build_order()?) {
            println!("  {}", line);
        }
    }

    if options.incremental_build_packages {
        let ledger = ctx.ledger()?;
        let plan = ChangeFilter::new(&collection, &ledger, &ctx.config.repositories_listing)
            .incremental_build_order()?;
        println!("Incremental build packages:");
        if plan.is_empty() {
            println!("  (none)");
        }
        for line in numbered(&plan) {
            println!("  {}", line);
        }
    }

    if options.remote_packages {
        let registry = registry.context("Registry client is not configured")?;
        let snapshot = RemoteSnapshot::fetch(registry, &collection).await?;
        println!("Remote packages ({}):", snapshot.len());
        for pkg in snapshot.packages().values() {
            println!("  {}@{}", pkg.name, pkg.version);
        }
    }

    if options.user_repositories {
        let source = source.context("Repository source is not configured")?;
        let repositories = source.list_repositories().await?;
        println!("Repositories ({}):", repositories.len());
        for repo in repositories {
            let visibility = if repo.private { "private" } else { "public" };
            println!("  {} ({}) {}", repo.full_name, visibility, repo.url);
        }
    }

    Ok(())
}

fn package_lines(collection: &PackageCollection) -> Vec<String> {
    collection
        .packages()
        .iter()
        .map(|p| {
            let private = if p.is_private { " private" } else { "" };
            format!("{}@{} [{}] {}{}", p.name, p.version, p.manager, p.folder_name, private)
        })
        .collect()
}

fn numbered(packages: &[&PackageDescriptor]) -> Vec<String> {
    packages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}@{}", i + 1, p.name, p.version))
        .collect()
}
