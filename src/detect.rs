//! Change detection between two revisions
//!
//! A package is changed when:
//!
//! - it owns a file that changed between the two revisions,
//! - it imports a package from a third-party module whose required version
//!   changed in a go.mod, or
//! - it imports a local package for which either of the above holds.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{ImpactEngine, ImpactEvent, Manifest, ManifestDelta};
use crate::source::{gomod, GitError, LoadError, ManifestError, PackageLoader, RevisionSource};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    GraphLoad(LoadError),

    #[error("listing changed files")]
    ListChangedFiles(#[source] GitError),

    #[error("reading {path} at {rev}")]
    RevisionRead {
        path: String,
        rev: String,
        #[source]
        err: GitError,
    },

    #[error("parsing mod file {path} at {rev}")]
    ManifestParse {
        path: String,
        rev: String,
        #[source]
        err: ManifestError,
    },

    #[error("interrupted")]
    Cancelled,
}

impl DetectError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DetectError::Cancelled)
    }
}

impl From<LoadError> for DetectError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Cancelled => DetectError::Cancelled,
            other => DetectError::GraphLoad(other),
        }
    }
}

/// Result of a detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    /// Impacted package paths, sorted
    pub packages: Vec<String>,

    /// Paths that differ between the two revisions
    pub changed_files: Vec<String>,

    /// Third-party modules whose required version changed, sorted
    pub changed_modules: Vec<String>,
}

/// Forwards impact decisions to the log
fn log_event(event: ImpactEvent<'_>) {
    match event {
        ImpactEvent::ChangedByFile { package, file } => {
            debug!(package, file, "package detected changed because of file")
        }
        ImpactEvent::ChangedByDependency {
            package,
            dependency,
        } => debug!(
            package,
            dependency, "package detected changed because of dependent package"
        ),
        ImpactEvent::ChangedByModule { package, module } => debug!(
            package,
            module, "package detected changed because of dependent 3rd party module"
        ),
    }
}

/// Resolves the modules whose version changed in one manifest
///
/// The manifest must exist at both revisions.
pub fn resolve_manifest_delta(
    source: &impl RevisionSource,
    path: &str,
    from: &str,
    to: &str,
) -> Result<ManifestDelta, DetectError> {
    let before = read_manifest(source, path, from)?;
    let after = read_manifest(source, path, to)?;
    Ok(ManifestDelta::between(&before, &after))
}

fn read_manifest(
    source: &impl RevisionSource,
    path: &str,
    rev: &str,
) -> Result<Manifest, DetectError> {
    let content = source
        .read_file_at_revision(path, rev)
        .map_err(|err| match err {
            GitError::Cancelled => DetectError::Cancelled,
            err => DetectError::RevisionRead {
                path: path.to_string(),
                rev: rev.to_string(),
                err,
            },
        })?;

    gomod::parse(path, &content).map_err(|err| DetectError::ManifestParse {
        path: path.to_string(),
        rev: rev.to_string(),
        err,
    })
}

/// Finds the packages changed between two revisions
pub struct ChangeDetector<L, R> {
    loader: L,
    source: R,
    repo_root: PathBuf,
    manifest_name: String,
}

impl<L: PackageLoader, R: RevisionSource> ChangeDetector<L, R> {
    /// `repo_root` must be the absolute path of the repository `source` reads
    pub fn new(loader: L, source: R, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            source,
            repo_root: repo_root.into(),
            manifest_name: "go.mod".to_string(),
        }
    }

    /// Overrides the file name treated as a dependency manifest
    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    fn is_manifest(&self, path: &str) -> bool {
        Path::new(path)
            .file_name()
            .is_some_and(|name| name == self.manifest_name.as_str())
    }

    /// Runs detection for the module in `mod_dir`
    pub fn detect(&self, mod_dir: &Path, from: &str, to: &str) -> Result<ImpactReport, DetectError> {
        let graph = self.loader.load(mod_dir)?;

        let changed_files = self
            .source
            .list_changed_files(from, to)
            .map_err(|err| match err {
                GitError::Cancelled => DetectError::Cancelled,
                err => DetectError::ListChangedFiles(err),
            })?;
        info!(files = ?changed_files, "changed files");

        let mut delta = ManifestDelta::new();
        for path in changed_files.iter().filter(|path| self.is_manifest(path)) {
            let changed = resolve_manifest_delta(&self.source, path, from, to)?;
            info!(manifest = %path, modules = ?changed, "changed 3rd party modules");
            delta.merge(changed);
        }

        let impacted = ImpactEngine::new(&graph, &self.repo_root)
            .with_sink(log_event)
            .compute(&changed_files, &delta);

        Ok(ImpactReport {
            packages: impacted.into_sorted(),
            changed_modules: delta.iter().map(str::to_string).collect(),
            changed_files,
        })
    }
}
