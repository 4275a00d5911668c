use anyhow::Result;
use std::path::Path;

use super::{PackageDescriptor, discover_packages};
use crate::runtime::Runtime;

/// Every local package found under the packages folder, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageCollection {
    packages: Vec<PackageDescriptor>,
}

impl PackageCollection {
    pub fn new(packages: Vec<PackageDescriptor>) -> Self {
        Self { packages }
    }

    pub fn scan<R: Runtime + ?Sized>(runtime: &R, packages_path: &Path) -> Result<Self> {
        Ok(Self::new(discover_packages(runtime, packages_path)?))
    }

    pub fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    /// Drop packages whose *package name* appears in `names`.
    pub fn without_names(&self, names: &[String]) -> Self {
        self.retain(|p| !names.contains(&p.name))
    }

    fn retain(&self, keep: impl Fn(&PackageDescriptor) -> bool) -> Self {
        Self::new(self.packages.iter().filter(|p| keep(p)).cloned().collect())
    }
}

impl From<Vec<PackageDescriptor>> for PackageCollection {
    fn from(packages: Vec<PackageDescriptor>) -> Self {
        Self::new(packages)
    }
}

impl<'a> IntoIterator for &'a PackageCollection {
    type Item = &'a PackageDescriptor;
    type IntoIter = std::slice::Iter<'a, PackageDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageCollection {
        PackageCollection::new(vec![
            PackageDescriptor::new("@scope/core", "1.0.0"),
            PackageDescriptor::new("@scope/lib", "1.0.0").with_dependency("@scope/core", "^1.0.0"),
            PackageDescriptor::new("@scope/app", "0.3.0")
                .with_dependency("@scope/lib", "^1.0.0")
                .private(),
        ])
    }

    #[test]
    fn test_lookup() {
        let collection = sample();
        assert_eq!(collection.len(), 3);
        assert!(collection.contains("@scope/lib"));
        assert!(!collection.contains("lib"));
        assert_eq!(collection.get("@scope/app").unwrap().folder_name, "app");
        assert_eq!(collection.names(), vec!["@scope/core", "@scope/lib", "@scope/app"]);
    }

    #[test]
    fn test_name_blacklist() {
        let collection = sample();
        assert_eq!(
            collection.without_names(&["@scope/lib".to_string()]).names(),
            vec!["@scope/core", "@scope/app"]
        );
    }
}
