//! Dependency graph over local packages.
//!
//! Packages are stored in an arena and referred to by their index in the
//! input slice. Edges point from a dependency to its dependent, so a
//! topological walk yields packages in the order they must be built.
//!
//! Only dependencies on packages that are part of the input produce edges;
//! anything else (registry packages, typos) is ignored.

mod error;

pub use error::GraphError;

use log::warn;
use std::collections::{HashMap, VecDeque};

use crate::package::PackageDescriptor;

pub struct DependencyGraph<'a> {
    packages: Vec<&'a PackageDescriptor>,
    index: HashMap<&'a str, usize>,
    /// dependency -> dependents, sorted by index
    dependents: Vec<Vec<usize>>,
    /// dependent -> dependencies, sorted by index
    dependencies: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(packages: &'a [PackageDescriptor]) -> Self {
        Self::with_whitelist(packages, &[])
    }

    /// Build the graph, only considering dependency names in `whitelist`.
    /// An empty whitelist means every name is considered.
    pub(crate) fn with_whitelist(packages: &'a [PackageDescriptor], whitelist: &[String]) -> Self {
        let mut nodes: Vec<&'a PackageDescriptor> = Vec::with_capacity(packages.len());
        let mut index: HashMap<&'a str, usize> = HashMap::with_capacity(packages.len());

        for pkg in packages {
            if pkg.name.is_empty() {
                warn!("Ignoring package at {:?} with an empty name", pkg.location);
                continue;
            }
            if index.contains_key(pkg.name.as_str()) {
                warn!(
                    "Duplicate package name '{}' at {:?}, keeping the first one",
                    pkg.name, pkg.location
                );
                continue;
            }
            index.insert(pkg.name.as_str(), nodes.len());
            nodes.push(pkg);
        }

        let n = nodes.len();
        let mut dependents = vec![Vec::new(); n];
        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0; n];

        for (dependent, pkg) in nodes.iter().enumerate() {
            for name in pkg.dependencies.keys() {
                if !whitelist.is_empty() && !whitelist.iter().any(|w| w == name) {
                    continue;
                }
                let Some(&dependency) = index.get(name.as_str()) else {
                    continue;
                };
                if dependencies[dependent].contains(&dependency) {
                    continue;
                }
                dependencies[dependent].push(dependency);
                dependents[dependency].push(dependent);
                in_degree[dependent] += 1;
            }
        }

        // `dependents` is filled in ascending dependent order already.
        for list in &mut dependencies {
            list.sort_unstable();
        }

        Self {
            packages: nodes,
            index,
            dependents,
            dependencies,
            in_degree,
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct in-graph dependencies of `name`, in input order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&'a PackageDescriptor> {
        self.neighbours(name, &self.dependencies)
    }

    /// Direct in-graph dependents of `name`, in input order.
    pub fn dependents_of(&self, name: &str) -> Vec<&'a PackageDescriptor> {
        self.neighbours(name, &self.dependents)
    }

    fn neighbours(&self, name: &str, adjacency: &[Vec<usize>]) -> Vec<&'a PackageDescriptor> {
        self.index
            .get(name)
            .map(|&i| adjacency[i].iter().map(|&j| self.packages[j]).collect())
            .unwrap_or_default()
    }

    /// Topological order, dependencies first.
    ///
    /// Kahn's algorithm with a FIFO queue seeded in input order, so packages
    /// with no ordering constraint between them keep their discovery order.
    pub fn build_order(&self) -> Result<Vec<&'a PackageDescriptor>, GraphError> {
        let n = self.packages.len();
        let mut in_degree = self.in_degree.clone();
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            sorted.push(node);
            for &dependent in &self.dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if sorted.len() < n {
            let mut unsorted = vec![true; n];
            for &i in &sorted {
                unsorted[i] = false;
            }
            return Err(self.circular_dependency(&unsorted));
        }

        Ok(sorted.into_iter().map(|i| self.packages[i]).collect())
    }

    /// `changed` plus everything that transitively depends on it, in build
    /// order. Names that are not in the graph are ignored.
    pub fn affected_packages<S: AsRef<str>>(
        &self,
        changed: &[S],
    ) -> Result<Vec<&'a PackageDescriptor>, GraphError> {
        let mut affected = vec![false; self.packages.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();

        for name in changed {
            if let Some(&i) = self.index.get(name.as_ref())
                && !affected[i]
            {
                affected[i] = true;
                queue.push_back(i);
            }
        }

        while let Some(node) = queue.pop_front() {
            for &dependent in &self.dependents[node] {
                if !affected[dependent] {
                    affected[dependent] = true;
                    queue.push_back(dependent);
                }
            }
        }

        let order = self.build_order()?;
        Ok(order
            .into_iter()
            .filter(|pkg| self.index.get(pkg.name.as_str()).is_some_and(|&i| affected[i]))
            .collect())
    }

    fn circular_dependency(&self, unsorted: &[bool]) -> GraphError {
        let name = |i: usize| self.packages[i].name.clone();
        GraphError::CircularDependency {
            unsortable: (0..self.packages.len())
                .filter(|&i| unsorted[i])
                .map(name)
                .collect(),
            cycle: self
                .find_cycle(unsorted)
                .map(|cycle| cycle.into_iter().map(name).collect()),
        }
    }

    /// Depth-first search over the `candidates` subgraph with an explicit
    /// stack of `(node, next neighbour)` frames.
    fn find_cycle(&self, candidates: &[bool]) -> Option<Vec<usize>> {
        let n = self.packages.len();
        let mut visited = vec![false; n];
        let mut on_path = vec![false; n];

        for start in 0..n {
            if !candidates[start] || visited[start] {
                continue;
            }

            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            visited[start] = true;
            on_path[start] = true;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&next) = self.dependents[node].get(frame.1) else {
                    on_path[node] = false;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                if !candidates[next] {
                    continue;
                }
                if on_path[next] {
                    let from = stack.iter().position(|&(i, _)| i == next)?;
                    let mut cycle: Vec<usize> = stack[from..].iter().map(|&(i, _)| i).collect();
                    cycle.push(next);
                    return Some(cycle);
                }
                if !visited[next] {
                    visited[next] = true;
                    on_path[next] = true;
                    stack.push((next, 0));
                }
            }
        }

        None
    }
}
