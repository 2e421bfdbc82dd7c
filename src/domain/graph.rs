//! Package graph for the module under analysis
//!
//! Holds local packages in dependency order: every package comes after all
//! the local packages it imports. Impact propagation walks this order once,
//! so both the ordering and single ownership of files are checked when the
//! graph is built. Uses petgraph to order packages that arrive unsorted.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::package::LocalPackage;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Duplicate package: {0}")]
    DuplicatePackage(String),

    #[error("Package {package} is listed before its dependency {dependency}")]
    NotTopological { package: String, dependency: String },

    #[error("Import cycle through package {0}")]
    CycleDetected(String),

    #[error("File {} is owned by both {first} and {second}", file.display())]
    SharedFile {
        file: PathBuf,
        first: String,
        second: String,
    },
}

/// Local packages in dependency order
#[derive(Debug, Default, Clone)]
pub struct PackageGraph {
    packages: Vec<LocalPackage>,

    /// Map from package path to position in `packages`
    index: HashMap<String, usize>,
}

impl PackageGraph {
    /// Builds a graph from packages that are already in dependency order
    pub fn new(packages: Vec<LocalPackage>) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(packages.len());
        for (pos, pkg) in packages.iter().enumerate() {
            if index.insert(pkg.path.clone(), pos).is_some() {
                return Err(GraphError::DuplicatePackage(pkg.path.clone()));
            }
        }

        for (pos, pkg) in packages.iter().enumerate() {
            for import_path in pkg.imports.keys() {
                if let Some(&dep_pos) = index.get(import_path) {
                    if dep_pos >= pos {
                        return Err(GraphError::NotTopological {
                            package: pkg.path.clone(),
                            dependency: import_path.clone(),
                        });
                    }
                }
            }
        }

        let mut owners: HashMap<&Path, &str> = HashMap::new();
        for pkg in &packages {
            for file in &pkg.files {
                if let Some(first) = owners.insert(file.as_path(), pkg.path.as_str()) {
                    return Err(GraphError::SharedFile {
                        file: file.clone(),
                        first: first.to_string(),
                        second: pkg.path.clone(),
                    });
                }
            }
        }

        Ok(Self { packages, index })
    }

    /// Builds a graph from packages in arbitrary order
    ///
    /// Packages are reordered so that local dependencies come first. Fails if
    /// the local imports form a cycle.
    pub fn sorted(packages: Vec<LocalPackage>) -> Result<Self, GraphError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(packages.len());

        for (pos, pkg) in packages.iter().enumerate() {
            if nodes.insert(pkg.path.as_str(), graph.add_node(pos)).is_some() {
                return Err(GraphError::DuplicatePackage(pkg.path.clone()));
            }
        }

        // Edge direction: dependency -> dependent
        for pkg in &packages {
            let pkg_idx = nodes[pkg.path.as_str()];
            for import_path in pkg.imports.keys() {
                if let Some(&dep_idx) = nodes.get(import_path.as_str()) {
                    graph.add_edge(dep_idx, pkg_idx, ());
                }
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            GraphError::CycleDetected(packages[graph[cycle.node_id()]].path.clone())
        })?;

        let mut slots: Vec<Option<LocalPackage>> = packages.into_iter().map(Some).collect();
        let ordered = order
            .into_iter()
            .filter_map(|idx| slots[graph[idx]].take())
            .collect();

        Self::new(ordered)
    }

    /// Returns the package owning `rel_path`, a path relative to `repo_root`
    ///
    /// Packages are scanned in order and the first owner wins. Paths owned by
    /// no package (deleted files, tooling at the repository root, go.mod)
    /// yield `None`.
    pub fn owner_of(&self, repo_root: &Path, rel_path: &str) -> Option<&LocalPackage> {
        let abs_path = repo_root.join(rel_path);
        self.packages.iter().find(|pkg| pkg.owns(&abs_path))
    }

    /// Returns the package with the given import path
    pub fn get(&self, path: &str) -> Option<&LocalPackage> {
        self.index.get(path).map(|&pos| &self.packages[pos])
    }

    /// Returns true if the graph contains the package
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Packages in dependency order
    pub fn packages(&self) -> &[LocalPackage] {
        &self.packages
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
