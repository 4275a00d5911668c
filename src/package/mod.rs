//! Local packages.
//!
//! Reading `package.json` manifests, expanding workspaces, and the
//! collection of descriptors every other component works from.

mod collection;
mod descriptor;
mod discovery;
mod manifest;

pub use collection::PackageCollection;
pub use descriptor::PackageDescriptor;
pub use discovery::discover_packages;
pub use manifest::{MANIFEST_FILE, Manifest, Workspaces, expand_workspace, read_manifest};
