//! Change propagation
//!
//! Computes the set of local packages impacted by a change in two phases:
//!
//! 1. **Direct**: every changed file is attributed to the package owning it.
//! 2. **Transitive**: a single forward pass over the packages in dependency
//!    order marks a package impacted as soon as one of its imports is an
//!    impacted local package, or belongs to a module whose version changed.
//!
//! Because dependencies are visited before dependents, one pass is enough to
//! carry impact along chains of any length.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use super::graph::PackageGraph;
use super::manifest::ManifestDelta;

/// Why a package was marked impacted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactEvent<'a> {
    /// One of the package's files changed
    ChangedByFile { package: &'a str, file: &'a str },

    /// The package imports an impacted local package
    ChangedByDependency { package: &'a str, dependency: &'a str },

    /// The package imports a package from a module whose version changed
    ChangedByModule { package: &'a str, module: &'a str },
}

impl ImpactEvent<'_> {
    /// The package the event is about
    pub fn package(&self) -> &str {
        match self {
            ImpactEvent::ChangedByFile { package, .. }
            | ImpactEvent::ChangedByDependency { package, .. }
            | ImpactEvent::ChangedByModule { package, .. } => package,
        }
    }
}

/// Paths of impacted packages, without any ordering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImpactSet {
    packages: HashSet<String>,
}

impl ImpactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: impl Into<String>) -> bool {
        self.packages.insert(package.into())
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }

    /// Consumes the set, returning package paths in lexical order
    pub fn into_sorted(self) -> Vec<String> {
        let mut packages: Vec<_> = self.packages.into_iter().collect();
        packages.sort();
        packages
    }
}

fn ignore_event(_: ImpactEvent<'_>) {}

/// Runs change propagation over a package graph
pub struct ImpactEngine<'a, F = fn(ImpactEvent<'_>)> {
    graph: &'a PackageGraph,
    repo_root: &'a Path,
    sink: F,
}

impl<'a> ImpactEngine<'a> {
    /// Creates an engine; `repo_root` is the absolute path that changed-file
    /// paths are relative to
    pub fn new(graph: &'a PackageGraph, repo_root: &'a Path) -> Self {
        Self {
            graph,
            repo_root,
            sink: ignore_event,
        }
    }
}

impl<'a, F> ImpactEngine<'a, F>
where
    F: FnMut(ImpactEvent<'_>),
{
    /// Replaces the event sink, which receives one event per impact decision
    pub fn with_sink<G>(self, sink: G) -> ImpactEngine<'a, G>
    where
        G: FnMut(ImpactEvent<'_>),
    {
        ImpactEngine {
            graph: self.graph,
            repo_root: self.repo_root,
            sink,
        }
    }

    /// Computes the impacted packages
    ///
    /// `changed_files` are relative to the repository root and may contain
    /// duplicates or paths owned by no package.
    pub fn compute(mut self, changed_files: &[String], delta: &ManifestDelta) -> ImpactSet {
        let mut impacted = ImpactSet::new();
        self.mark_changed_files(&mut impacted, changed_files);
        self.propagate(&mut impacted, delta);
        impacted
    }

    fn mark_changed_files(&mut self, impacted: &mut ImpactSet, changed_files: &[String]) {
        for file in changed_files {
            if let Some(pkg) = self.graph.owner_of(self.repo_root, file) {
                (self.sink)(ImpactEvent::ChangedByFile {
                    package: pkg.path.as_str(),
                    file: file.as_str(),
                });
                impacted.insert(pkg.path.as_str());
            }
        }
    }

    fn propagate(&mut self, impacted: &mut ImpactSet, delta: &ManifestDelta) {
        for pkg in self.graph.iter() {
            if impacted.contains(&pkg.path) {
                continue;
            }

            let cause = pkg.imports.values().find_map(|import| {
                if impacted.contains(&import.path) {
                    return Some(ImpactEvent::ChangedByDependency {
                        package: &pkg.path,
                        dependency: &import.path,
                    });
                }
                import
                    .module
                    .as_ref()
                    .filter(|module| delta.contains(&module.path))
                    .map(|module| ImpactEvent::ChangedByModule {
                        package: &pkg.path,
                        module: &module.path,
                    })
            });

            if let Some(event) = cause {
                (self.sink)(event);
                impacted.insert(pkg.path.as_str());
            }
        }
    }
}

/// Computes the packages impacted by `changed_files` and `delta`
pub fn compute_impacted_packages(
    graph: &PackageGraph,
    repo_root: &Path,
    changed_files: &[String],
    delta: &ManifestDelta,
) -> ImpactSet {
    ImpactEngine::new(graph, repo_root).compute(changed_files, delta)
}
