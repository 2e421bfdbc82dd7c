//! Dependency manifest snapshots and the version delta between two of them

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A `require`d module as declared in a manifest snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequirement {
    pub path: String,
    pub version: String,
}

/// A parsed manifest at one revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Path declared by the `module` directive, if any
    pub module: Option<String>,

    /// Module path -> pinned version
    pub requires: BTreeMap<String, String>,
}

impl Manifest {
    /// Records a requirement; a later entry for the same module replaces an earlier one
    pub fn require(&mut self, req: ModuleRequirement) {
        self.requires.insert(req.path, req.version);
    }

    /// Returns the pinned version of a module
    pub fn version_of(&self, module: &str) -> Option<&str> {
        self.requires.get(module).map(String::as_str)
    }
}

/// Modules whose pinned version changed between two manifest snapshots
///
/// Only modules required by both snapshots take part: a module that was
/// added or removed is never part of the delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManifestDelta {
    modules: BTreeSet<String>,
}

impl ManifestDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the delta from `before` to `after`
    pub fn between(before: &Manifest, after: &Manifest) -> Self {
        let modules = after
            .requires
            .iter()
            .filter(|(path, version)| {
                before
                    .version_of(path)
                    .is_some_and(|old| old != version.as_str())
            })
            .map(|(path, _)| path.clone())
            .collect();

        Self { modules }
    }

    /// Folds another delta into this one
    pub fn merge(&mut self, other: ManifestDelta) {
        self.modules.extend(other.modules);
    }

    pub fn insert(&mut self, module: impl Into<String>) -> bool {
        self.modules.insert(module.into())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ManifestDelta {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().map(Into::into).collect(),
        }
    }
}
