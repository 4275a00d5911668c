use anyhow::{Context as _, Result, bail};
use log::{debug, warn};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::package::{MANIFEST_FILE, PackageCollection};
use crate::package_manager::NODE_MODULES;
use crate::runtime::{Runtime, copy_tree, write_atomic};

use super::Context;

pub const MONOREPO_NAME: &str = "@perseverancia/master";
const APPS_FOLDER: &str = "apps";
const PACKAGES_FOLDER: &str = "packages";

#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// Defaults to the configured packages path.
    pub packages_path: Option<PathBuf>,
    /// Defaults to `<app>/monorepo`.
    pub monorepo_path: Option<PathBuf>,
}

/// A package copied into the monorepo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedPackage {
    pub name: String,
    pub destination: PathBuf,
}

/// Copy every local package into one monorepo: private packages under
/// `apps/`, the rest under `packages/`, with a root manifest declaring both
/// as workspaces.
///
/// Repositories on the blacklist and names in `packagesBlacklist` are left
/// out. `node_modules` is never copied.
#[tracing::instrument(skip(ctx))]
pub fn combine<R: Runtime>(ctx: &Context<R>, options: CombineOptions) -> Result<Vec<CombinedPackage>> {
    let runtime = &ctx.runtime;
    let packages_path = options.packages_path.unwrap_or_else(|| ctx.packages_path());
    let monorepo = options.monorepo_path.unwrap_or_else(|| ctx.app.monorepo());

    if !runtime.is_dir(&packages_path) {
        bail!("The packages path {} doesn't exist", packages_path.display());
    }

    for folder in [APPS_FOLDER, PACKAGES_FOLDER] {
        runtime
            .create_dir_all(&monorepo.join(folder))
            .with_context(|| format!("Couldn't create the monorepo at {}", monorepo.display()))?;
    }

    let blacklist = &ctx.config.repositories_listing.blacklist;
    let collection = PackageCollection::scan(runtime, &packages_path)?
        .without_names(&ctx.config.packages_blacklist);

    let mut used = HashSet::new();
    let mut combined = Vec::new();
    for pkg in collection.packages() {
        if blacklist.contains(&pkg.folder_name) {
            debug!("{} is blacklisted, not combining it", pkg.folder_name);
            continue;
        }

        let group = if pkg.is_private { APPS_FOLDER } else { PACKAGES_FOLDER };
        let relative = Path::new(group).join(&pkg.folder_name);
        if !used.insert(relative.clone()) {
            warn!(
                "{} would overwrite {}, skipping {:?}",
                pkg.name,
                relative.display(),
                pkg.location
            );
            continue;
        }

        let destination = monorepo.join(&relative);
        let files = copy_tree(runtime, &pkg.location, &destination, &[NODE_MODULES])
            .with_context(|| format!("Failed to copy {} into the monorepo", pkg.name))?;
        println!("  {} -> {} ({} files)", pkg.name, relative.display(), files);

        combined.push(CombinedPackage {
            name: pkg.name.clone(),
            destination,
        });
    }

    write_root_manifest(runtime, &monorepo)?;
    println!(
        "Combined {} packages into {}",
        combined.len(),
        monorepo.display()
    );
    Ok(combined)
}

/// Create or update `<monorepo>/package.json` with the monorepo name and the
/// `apps/*` and `packages/*` workspaces, keeping any other fields.
fn write_root_manifest<R: Runtime + ?Sized>(runtime: &R, monorepo: &Path) -> Result<()> {
    let path = monorepo.join(MANIFEST_FILE);
    let mut manifest: Map<String, Value> = if runtime.exists(&path) {
        let content = runtime.read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest at {}", path.display()))?
    } else {
        let mut fresh = Map::new();
        fresh.insert("version".into(), json!("1.0.0"));
        fresh.insert("private".into(), json!(true));
        fresh
    };

    manifest.insert("name".into(), json!(MONOREPO_NAME));

    let workspaces = manifest
        .entry("workspaces")
        .or_insert_with(|| json!([]));
    let list = match workspaces {
        Value::Array(list) => list,
        Value::Object(object) => match object
            .entry("packages")
            .or_insert_with(|| json!([]))
        {
            Value::Array(list) => list,
            _ => bail!("`workspaces.packages` in {} is not an array", path.display()),
        },
        _ => bail!("`workspaces` in {} is not an array", path.display()),
    };
    for pattern in ["apps/*", "packages/*"] {
        if !list.iter().any(|v| v.as_str() == Some(pattern)) {
            list.push(json!(pattern));
        }
    }

    let mut content = serde_json::to_string_pretty(&manifest)?;
    content.push('\n');
    write_atomic(runtime, &path, content.as_bytes())
}
