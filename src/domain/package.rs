//! Local packages and their imports

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A versioned module that owns an imported package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleRef {
    pub path: String,
    pub version: String,
}

impl ModuleRef {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }
}

/// A package imported by a local package
///
/// `module` is `None` for packages of the module under analysis and for the
/// standard library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedPackage {
    pub path: String,
    pub module: Option<ModuleRef>,
}

impl ImportedPackage {
    /// An import of a package that belongs to no external module
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module: None,
        }
    }

    /// An import of a package owned by a third-party module
    pub fn external(path: impl Into<String>, module: ModuleRef) -> Self {
        Self {
            path: path.into(),
            module: Some(module),
        }
    }
}

/// A package of the module under analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalPackage {
    /// Import path, e.g. `example.com/repo/internal/flag`
    pub path: String,

    /// Absolute paths of every file the package owns (build, auxiliary and
    /// embedded files)
    pub files: BTreeSet<PathBuf>,

    /// Imported package path -> imported package
    pub imports: BTreeMap<String, ImportedPackage>,
}

impl LocalPackage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            files: BTreeSet::new(),
            imports: BTreeMap::new(),
        }
    }

    /// Adds an owned file
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.insert(file.into());
        self
    }

    /// Adds an import
    pub fn with_import(mut self, import: ImportedPackage) -> Self {
        self.imports.insert(import.path.clone(), import);
        self
    }

    /// Returns true if the package lists `abs_path` among its files
    pub fn owns(&self, abs_path: &Path) -> bool {
        self.files.contains(abs_path)
    }
}
