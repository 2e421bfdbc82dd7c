//! Local package discovery through `go list`
//!
//! `go list -deps` lists a package only after all of its dependencies, so the
//! root packages (those matched by `./...`) come out in dependency order. The
//! dependency-only entries are still needed to find the module owning each
//! import.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::process::{run_command, CancelToken, CommandError};
use crate::domain::{GraphError, ImportedPackage, LocalPackage, ModuleRef, PackageGraph};

const LIST_FIELDS: &str = "ImportPath,Dir,GoFiles,CgoFiles,CFiles,CXXFiles,MFiles,HFiles,FFiles,\
SFiles,SwigFiles,SwigCXXFiles,SysoFiles,EmbedFiles,Imports,Module,Error,DepsErrors,DepOnly";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed listing local packages")]
    List(#[source] CommandError),

    #[error("failed listing local packages: decoding go list output")]
    Decode(#[source] serde_json::Error),

    #[error("failed querying package {package}: {errors}")]
    Package { package: String, errors: String },

    #[error("failed listing local packages")]
    Graph(#[source] GraphError),

    #[error("interrupted")]
    Cancelled,
}

impl From<GraphError> for LoadError {
    fn from(err: GraphError) -> Self {
        LoadError::Graph(err)
    }
}

/// Produces the local packages of a module in dependency order
pub trait PackageLoader {
    fn load(&self, mod_dir: &Path) -> Result<PackageGraph, LoadError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedPackage {
    import_path: String,
    dir: PathBuf,
    go_files: Vec<String>,
    cgo_files: Vec<String>,
    c_files: Vec<String>,
    #[serde(rename = "CXXFiles")]
    cxx_files: Vec<String>,
    m_files: Vec<String>,
    h_files: Vec<String>,
    f_files: Vec<String>,
    s_files: Vec<String>,
    swig_files: Vec<String>,
    #[serde(rename = "SwigCXXFiles")]
    swig_cxx_files: Vec<String>,
    syso_files: Vec<String>,
    embed_files: Vec<String>,
    imports: Vec<String>,
    module: Option<ListedModule>,
    error: Option<ListedError>,
    deps_errors: Vec<ListedError>,
    dep_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedModule {
    path: String,
    version: String,
    main: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedError {
    pos: String,
    err: String,
}

impl ListedError {
    fn render(&self) -> String {
        if self.pos.is_empty() {
            self.err.clone()
        } else {
            format!("{}: {}", self.pos, self.err)
        }
    }
}

impl ListedPackage {
    /// Build files, auxiliary files and embedded files, as absolute paths
    fn owned_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        [
            &self.go_files,
            &self.cgo_files,
            &self.c_files,
            &self.cxx_files,
            &self.m_files,
            &self.h_files,
            &self.f_files,
            &self.s_files,
            &self.swig_files,
            &self.swig_cxx_files,
            &self.syso_files,
            &self.embed_files,
        ]
        .into_iter()
        .flatten()
        .map(|file| self.dir.join(file))
    }

    fn errors(&self) -> Vec<String> {
        self.error
            .iter()
            .chain(&self.deps_errors)
            .map(ListedError::render)
            .collect()
    }

    /// The module owning this package, unless it is the main module or the
    /// standard library
    fn external_module(&self) -> Option<ModuleRef> {
        self.module
            .as_ref()
            .filter(|module| !module.main)
            .map(|module| ModuleRef::new(&module.path, &module.version))
    }
}

/// Decodes the stream of JSON objects printed by `go list -json`
fn decode(out: &str) -> Result<Vec<ListedPackage>, LoadError> {
    serde_json::Deserializer::from_str(out)
        .into_iter::<ListedPackage>()
        .collect::<Result<_, _>>()
        .map_err(LoadError::Decode)
}

/// Builds the local packages from `go list -deps` output
fn build_graph(listed: Vec<ListedPackage>) -> Result<PackageGraph, LoadError> {
    let by_path: HashMap<&str, &ListedPackage> = listed
        .iter()
        .map(|pkg| (pkg.import_path.as_str(), pkg))
        .collect();

    let mut packages = Vec::new();
    for pkg in listed.iter().filter(|pkg| !pkg.dep_only) {
        let errors = pkg.errors();
        if !errors.is_empty() {
            return Err(LoadError::Package {
                package: pkg.import_path.clone(),
                errors: errors.join("; "),
            });
        }

        let mut local = LocalPackage::new(&pkg.import_path);
        local.files.extend(pkg.owned_files());
        for import_path in &pkg.imports {
            let module = by_path
                .get(import_path.as_str())
                .and_then(|imported| imported.external_module());
            local.imports.insert(
                import_path.clone(),
                ImportedPackage {
                    path: import_path.clone(),
                    module,
                },
            );
        }
        packages.push(local);
    }

    match PackageGraph::new(packages.clone()) {
        Err(GraphError::NotTopological {
            package,
            dependency,
        }) => {
            debug!(%package, %dependency, "listing is not in dependency order, sorting");
            Ok(PackageGraph::sorted(packages)?)
        }
        graph => Ok(graph?),
    }
}

/// Loads packages by running `go list` in the module directory
#[derive(Debug, Clone)]
pub struct GoListLoader {
    go: PathBuf,
    cancel: CancelToken,
}

impl GoListLoader {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            go: PathBuf::from("go"),
            cancel,
        }
    }

    /// Uses a specific go executable
    pub fn with_binary(mut self, go: impl Into<PathBuf>) -> Self {
        self.go = go.into();
        self
    }
}

impl PackageLoader for GoListLoader {
    fn load(&self, mod_dir: &Path) -> Result<PackageGraph, LoadError> {
        let mut cmd = Command::new(&self.go);
        cmd.args(["list", "-e", "-deps"])
            .arg(format!("-json={}", LIST_FIELDS))
            .arg("./...")
            .current_dir(mod_dir)
            // go resolves its working directory from PWD when it matches
            .env("PWD", mod_dir);

        let out = run_command(cmd, &self.cancel).map_err(|err| match err {
            CommandError::Cancelled => LoadError::Cancelled,
            other => LoadError::List(other),
        })?;

        let graph = build_graph(decode(&out)?)?;
        debug!(packages = graph.len(), dir = %mod_dir.display(), "loaded local packages");
        Ok(graph)
    }
}
