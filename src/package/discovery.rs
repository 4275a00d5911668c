use anyhow::Result;
use log::{debug, warn};
use std::path::Path;

use super::{Manifest, PackageDescriptor, expand_workspace, read_manifest};
use crate::package_manager::PackageManagerKind;
use crate::runtime::Runtime;

/// Scan the direct children of `root` for packages.
///
/// Directory structure: `<root>/<repo>/package.json`. A repository whose
/// manifest declares `workspaces` contributes its members instead of itself.
/// Unreadable manifests are skipped with a warning so one broken repository
/// does not hide the rest.
#[tracing::instrument(skip(runtime))]
pub fn discover_packages<R: Runtime + ?Sized>(
    runtime: &R,
    root: &Path,
) -> Result<Vec<PackageDescriptor>> {
    let mut packages = Vec::new();

    if !runtime.exists(root) {
        warn!("Packages folder {:?} does not exist", root);
        return Ok(packages);
    }

    for repo_path in runtime.read_dir(root)? {
        if !runtime.is_dir(&repo_path) {
            continue;
        }

        let Some(manifest) = load_manifest(runtime, &repo_path) else {
            continue;
        };

        if manifest.is_workspace_root() {
            discover_workspace(runtime, &repo_path, &manifest, &mut packages)?;
        } else {
            let manager = PackageManagerKind::detect(runtime, &[&repo_path]);
            packages.extend(PackageDescriptor::from_manifest(&repo_path, manifest, manager));
        }
    }

    debug!("Discovered {} packages under {:?}", packages.len(), root);
    Ok(packages)
}

fn discover_workspace<R: Runtime + ?Sized>(
    runtime: &R,
    root: &Path,
    manifest: &Manifest,
    packages: &mut Vec<PackageDescriptor>,
) -> Result<()> {
    let patterns = manifest
        .workspaces
        .as_ref()
        .map(|w| w.patterns())
        .unwrap_or_default();

    for entry in patterns {
        for member in expand_workspace(runtime, root, entry)? {
            let Some(member_manifest) = load_manifest(runtime, &member) else {
                continue;
            };
            let manager = PackageManagerKind::detect(runtime, &[&member, root]);
            packages.extend(PackageDescriptor::from_manifest(
                &member,
                member_manifest,
                manager,
            ));
        }
    }
    Ok(())
}

fn load_manifest<R: Runtime + ?Sized>(runtime: &R, dir: &Path) -> Option<Manifest> {
    match read_manifest(runtime, dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Skipping {:?}: {:#}", dir, e);
            None
        }
    }
}
