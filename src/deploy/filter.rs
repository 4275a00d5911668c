use log::{debug, warn};
use semver::Version;
use std::cmp::Ordering;

use super::VersionBaseline;
use crate::config::ListingPolicy;
use crate::graph::{DependencyGraph, GraphError};
use crate::package::{PackageCollection, PackageDescriptor};

/// `true` when `local` should be deployed over what was last deployed.
///
/// Nothing deployed yet always counts as a change. Build metadata does not
/// make a version newer. When either side is not valid semver the strings
/// are compared instead.
pub fn version_changed(name: &str, local: &str, deployed: Option<&str>) -> bool {
    let Some(deployed) = deployed else {
        return true;
    };

    match (Version::parse(local.trim()), Version::parse(deployed.trim())) {
        (Ok(local), Ok(deployed)) => local.cmp_precedence(&deployed) == Ordering::Greater,
        _ => {
            let changed = local.trim() != deployed.trim();
            warn!(
                "{}: cannot compare versions '{}' and '{}' as semver, treating as {}",
                name,
                local,
                deployed,
                if changed { "changed" } else { "unchanged" }
            );
            changed
        }
    }
}

/// Decides which local packages need deploying.
///
/// Results borrow from the collection only, so the baseline can be mutated
/// once a plan has been computed.
pub struct ChangeFilter<'a, 'b, B: ?Sized> {
    collection: &'a PackageCollection,
    baseline: &'b B,
    policy: &'b ListingPolicy,
    ignore_apps: bool,
}

impl<'a, 'b, B: VersionBaseline + ?Sized> ChangeFilter<'a, 'b, B> {
    pub fn new(collection: &'a PackageCollection, baseline: &'b B, policy: &'b ListingPolicy) -> Self {
        Self {
            collection,
            baseline,
            policy,
            ignore_apps: false,
        }
    }

    /// Drop private packages from every result.
    pub fn ignore_apps(mut self, ignore: bool) -> Self {
        self.ignore_apps = ignore;
        self
    }

    /// Packages never deployed, or whose local version is ahead of the
    /// baseline.
    pub fn directly_affected(&self) -> Vec<&'a PackageDescriptor> {
        self.collection
            .packages()
            .iter()
            .filter(|pkg| {
                version_changed(
                    &pkg.name,
                    &pkg.version,
                    self.baseline.deployed_version(&pkg.name),
                )
            })
            .collect()
    }

    /// Listing policy on folder names, then the private-package switch.
    pub fn apply_policy(&self, packages: Vec<&'a PackageDescriptor>) -> Vec<&'a PackageDescriptor> {
        packages
            .into_iter()
            .filter(|pkg| self.policy.allows(&pkg.folder_name))
            .filter(|pkg| !(self.ignore_apps && pkg.is_private))
            .collect()
    }

    /// Whole collection in build order, filtered by policy.
    pub fn filter_by_configuration(&self) -> Result<Vec<&'a PackageDescriptor>, GraphError> {
        let graph = DependencyGraph::new(self.collection.packages());
        Ok(self.apply_policy(graph.build_order()?))
    }

    /// Changed packages and their transitive dependents, in build order,
    /// filtered by policy.
    ///
    /// Policy is applied after the graph walk, so a package excluded by
    /// policy still pulls its dependents in.
    pub fn incremental_build_order(&self) -> Result<Vec<&'a PackageDescriptor>, GraphError> {
        let changed: Vec<&str> = self
            .directly_affected()
            .iter()
            .map(|pkg| pkg.name.as_str())
            .collect();
        debug!("Directly changed packages: {:?}", changed);

        let graph = DependencyGraph::new(self.collection.packages());
        let affected = graph.affected_packages(&changed)?;
        Ok(self.apply_policy(affected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeploymentLedger;

    fn names(packages: &[&PackageDescriptor]) -> Vec<String> {
        packages.iter().map(|p| p.name.clone()).collect()
    }

    /// core <- lib <- app (private)
    fn chain(core_version: &str) -> PackageCollection {
        PackageCollection::new(vec![
            PackageDescriptor::new("core", core_version),
            PackageDescriptor::new("lib", "1.0.0").with_dependency("core", "^1.0.0"),
            PackageDescriptor::new("app", "1.0.0")
                .with_dependency("lib", "^1.0.0")
                .private(),
        ])
    }

    fn allow_all() -> ListingPolicy {
        ListingPolicy::blacklist(Vec::<String>::new())
    }

    #[test]
    fn test_version_changed() {
        assert!(version_changed("a", "1.0.0", None));
        assert!(version_changed("a", "1.0.1", Some("1.0.0")));
        assert!(!version_changed("a", "1.0.0", Some("1.0.0")));
        assert!(!version_changed("a", "0.9.0", Some("1.0.0")));
        assert!(version_changed("a", "1.0.0", Some("1.0.0-beta.1")));
    }

    #[test]
    fn test_version_changed_ignores_build_metadata() {
        assert!(!version_changed("a", "1.0.0+b2", Some("1.0.0+b1")));
        assert!(!version_changed("a", "1.0.0+b1", Some("1.0.0")));
        assert!(version_changed("a", "1.0.1+b1", Some("1.0.0+b9")));
    }

    #[test]
    fn test_version_changed_falls_back_to_string_compare() {
        assert!(version_changed("a", "next", Some("1.0.0")));
        assert!(!version_changed("a", "latest", Some("latest")));
        assert!(version_changed("a", "1.0", Some("1.0.0")));
    }

    #[test]
    fn test_incremental_from_ledger() {
        let collection = chain("1.0.1");
        let ledger: DeploymentLedger = [("core", "1.0.0")].into_iter().collect();
        let policy = allow_all();

        let filter = ChangeFilter::new(&collection, &ledger, &policy);
        assert_eq!(names(&filter.directly_affected()), vec!["core", "lib", "app"]);
        assert_eq!(
            names(&filter.incremental_build_order().unwrap()),
            vec!["core", "lib", "app"]
        );
    }

    #[test]
    fn test_dependents_are_scheduled_even_when_recorded() {
        let collection = chain("1.0.1");
        let ledger: DeploymentLedger = [("core", "1.0.0"), ("lib", "1.0.0"), ("app", "1.0.0")]
            .into_iter()
            .collect();
        let policy = allow_all();

        let filter = ChangeFilter::new(&collection, &ledger, &policy);
        assert_eq!(names(&filter.directly_affected()), vec!["core"]);
        assert_eq!(
            names(&filter.incremental_build_order().unwrap()),
            vec!["core", "lib", "app"]
        );
    }

    #[test]
    fn test_whitelist_applies_after_graph_walk() {
        let collection = chain("1.0.1");
        let ledger: DeploymentLedger = [("core", "1.0.0")].into_iter().collect();
        let policy = ListingPolicy::whitelist(["core", "lib"]);

        let filter = ChangeFilter::new(&collection, &ledger, &policy);
        assert_eq!(
            names(&filter.incremental_build_order().unwrap()),
            vec!["core", "lib"]
        );
    }

    #[test]
    fn test_excluded_intermediate_does_not_stop_dependents() {
        let collection = chain("1.0.1");
        let ledger: DeploymentLedger = [("core", "1.0.0"), ("lib", "1.0.0"), ("app", "1.0.0")]
            .into_iter()
            .collect();
        let policy = ListingPolicy::blacklist(["lib"]);

        let filter = ChangeFilter::new(&collection, &ledger, &policy);
        assert_eq!(
            names(&filter.incremental_build_order().unwrap()),
            vec!["core", "app"]
        );
    }

    #[test]
    fn test_nothing_changed_is_empty_and_stable() {
        let collection = chain("1.0.0");
        let mut ledger: DeploymentLedger = [("core", "1.0.0"), ("lib", "1.0.0"), ("app", "1.0.0")]
            .into_iter()
            .collect();
        let policy = allow_all();

        assert!(
            ChangeFilter::new(&collection, &ledger, &policy)
                .incremental_build_order()
                .unwrap()
                .is_empty()
        );

        // recording a deployment of the current versions keeps it empty
        for pkg in collection.packages() {
            ledger.record(&pkg.name, &pkg.version);
        }
        assert!(
            ChangeFilter::new(&collection, &ledger, &policy)
                .incremental_build_order()
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_ignore_apps_drops_private_packages() {
        let collection = chain("1.0.0");
        let ledger = DeploymentLedger::new();
        let policy = allow_all();

        let filter = ChangeFilter::new(&collection, &ledger, &policy).ignore_apps(true);
        assert_eq!(
            names(&filter.incremental_build_order().unwrap()),
            vec!["core", "lib"]
        );
        assert_eq!(
            names(&filter.filter_by_configuration().unwrap()),
            vec!["core", "lib"]
        );
    }

    #[test]
    fn test_filter_by_configuration_uses_build_order() {
        let collection = PackageCollection::new(vec![
            PackageDescriptor::new("app", "1.0.0").with_dependency("lib", "*"),
            PackageDescriptor::new("lib", "1.0.0").with_dependency("core", "*"),
            PackageDescriptor::new("core", "1.0.0"),
        ]);
        let ledger = DeploymentLedger::new();
        let policy = ListingPolicy::whitelist(["core", "app"]);

        let filter = ChangeFilter::new(&collection, &ledger, &policy);
        assert_eq!(
            names(&filter.filter_by_configuration().unwrap()),
            vec!["core", "app"]
        );
    }

    #[test]
    fn test_cycle_is_reported() {
        let collection = PackageCollection::new(vec![
            PackageDescriptor::new("a", "1.0.0").with_dependency("b", "*"),
            PackageDescriptor::new("b", "1.0.0").with_dependency("a", "*"),
        ]);
        let ledger = DeploymentLedger::new();
        let policy = allow_all();

        let filter = ChangeFilter::new(&collection, &ledger, &policy);
        assert!(matches!(
            filter.incremental_build_order(),
            Err(GraphError::CircularDependency { .. })
        ));
    }
}
