//! Detection against real git repositories
//!
//! Packages come from a fixed in-memory loader so these tests only need
//! `git`; the repository contents and revisions are real.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use changed_pkgs::detect::{ChangeDetector, DetectError};
use changed_pkgs::domain::{ImportedPackage, LocalPackage, ModuleRef, PackageGraph};
use changed_pkgs::source::{CancelToken, GitRepo, LoadError, PackageLoader, RevisionSource};
use tempfile::TempDir;

const GO_MOD_V1: &str = "module example.com/test-repo

go 1.21

require (
	github.com/foo/bar v1.0.0
	github.com/baz/qux v0.3.0
)
";

/// Packages of the test module, rooted at the repository directory
struct FixedLoader {
    root: PathBuf,
}

impl PackageLoader for FixedLoader {
    fn load(&self, _mod_dir: &Path) -> Result<PackageGraph, LoadError> {
        let file = |rel: &str| self.root.join(rel);
        let bar = ModuleRef::new("github.com/foo/bar", "v1.0.0");
        let qux = ModuleRef::new("github.com/baz/qux", "v0.3.0");

        Ok(PackageGraph::new(vec![
            LocalPackage::new("example.com/test-repo/internal/store")
                .with_file(file("internal/store/store.go"))
                .with_import(ImportedPackage::external("github.com/foo/bar/client", bar)),
            LocalPackage::new("example.com/test-repo/internal/api")
                .with_file(file("internal/api/api.go"))
                .with_file(file("internal/api/static/index.html"))
                .with_import(ImportedPackage::local("example.com/test-repo/internal/store")),
            LocalPackage::new("example.com/test-repo/tools")
                .with_file(file("tools/tools.go"))
                .with_import(ImportedPackage::external("github.com/baz/qux", qux)),
            LocalPackage::new("example.com/test-repo")
                .with_file(file("main.go"))
                .with_import(ImportedPackage::local("example.com/test-repo/internal/api")),
        ])?)
    }
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "user.name=changed-test", "-c", "user.email=changed-test@example.com"])
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("git should be installed");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Commits the working tree and returns the new HEAD
fn commit(dir: &Path, message: &str) -> String {
    git(dir, &["add", "--all"]);
    git(dir, &["commit", "--no-verify", "--allow-empty", "--quiet", "--message", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Writes the test module under `module_dir` (relative to the repository)
fn write_module(dir: &Path, module_dir: &str) {
    let module = dir.join(module_dir);
    write(&module, "go.mod", GO_MOD_V1);
    write(&module, "main.go", "package main\n");
    write(&module, "internal/store/store.go", "package store\n");
    write(&module, "internal/api/api.go", "package api\n");
    write(&module, "internal/api/static/index.html", "<html></html>\n");
    write(&module, "tools/tools.go", "package tools\n");
}

/// Creates a repository with the test module committed, returning it and HEAD
fn setup_repo() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "--quiet"]);

    write_module(dir.path(), "");
    write(dir.path(), "README.md", "# test repo\n");

    let head = commit(dir.path(), "initial");
    (dir, head)
}

/// Like [`setup_repo`], with the module in `service/` next to other content
fn setup_nested_repo() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "--quiet"]);

    write_module(dir.path(), "service");
    write(dir.path(), "web/app.js", "console.log('v1')\n");
    write(dir.path(), "README.md", "# test repo\n");

    let head = commit(dir.path(), "initial");
    (dir, head)
}

/// Renders the error with its causes, the way the binary prints it
fn chain(err: DetectError) -> String {
    format!("{:#}", anyhow::Error::new(err))
}

fn detector(dir: &Path) -> ChangeDetector<FixedLoader, GitRepo> {
    module_detector(dir, "")
}

/// Detector for a repository whose module lives in `module_dir`
fn module_detector(dir: &Path, module_dir: &str) -> ChangeDetector<FixedLoader, GitRepo> {
    let root = dir.canonicalize().unwrap();
    ChangeDetector::new(
        FixedLoader {
            root: root.join(module_dir),
        },
        GitRepo::new(&root, CancelToken::new()),
        root,
    )
}

#[test]
fn lists_changed_files_between_revisions() {
    let (dir, from) = setup_repo();
    write(dir.path(), "tools/tools.go", "package tools\n\n// changed\n");
    write(dir.path(), "docs/new file.md", "hello\n");
    let to = commit(dir.path(), "change");

    let repo = GitRepo::new(dir.path(), CancelToken::new());
    let mut files = repo.list_changed_files(&from, &to).unwrap();
    files.sort();
    assert_eq!(files, vec!["docs/new file.md", "tools/tools.go"]);
}

#[test]
fn reads_file_at_revision() {
    let (dir, from) = setup_repo();
    write(dir.path(), "README.md", "# renamed\n");
    let to = commit(dir.path(), "readme");

    let repo = GitRepo::new(dir.path(), CancelToken::new());
    assert_eq!(repo.read_file_at_revision("README.md", &from).unwrap(), "# test repo\n");
    assert_eq!(repo.read_file_at_revision("README.md", &to).unwrap(), "# renamed\n");
    assert!(repo.read_file_at_revision("missing.go", &to).is_err());
}

#[test]
fn change_in_leaf_package_propagates_to_importers() {
    let (dir, from) = setup_repo();
    write(dir.path(), "internal/store/store.go", "package store\n\nvar X = 1\n");
    let to = commit(dir.path(), "store");

    let report = detector(dir.path()).detect(dir.path(), &from, &to).unwrap();
    assert_eq!(
        report.packages,
        vec![
            "example.com/test-repo",
            "example.com/test-repo/internal/api",
            "example.com/test-repo/internal/store",
        ]
    );
}

#[test]
fn change_in_embedded_file() {
    let (dir, from) = setup_repo();
    write(dir.path(), "internal/api/static/index.html", "<html>v2</html>\n");
    let to = commit(dir.path(), "embed");

    let report = detector(dir.path()).detect(dir.path(), &from, &to).unwrap();
    assert_eq!(
        report.packages,
        vec!["example.com/test-repo", "example.com/test-repo/internal/api"]
    );
}

#[test]
fn change_outside_packages_impacts_nothing() {
    let (dir, from) = setup_repo();
    write(dir.path(), "README.md", "# docs only\n");
    let to = commit(dir.path(), "docs");

    let report = detector(dir.path()).detect(dir.path(), &from, &to).unwrap();
    assert!(report.packages.is_empty());
    assert_eq!(report.changed_files, vec!["README.md"]);
}

#[test]
fn dependency_upgrade_impacts_importers() {
    let (dir, from) = setup_repo();
    write(
        dir.path(),
        "go.mod",
        &GO_MOD_V1.replace("github.com/baz/qux v0.3.0", "github.com/baz/qux v0.4.0"),
    );
    let to = commit(dir.path(), "upgrade qux");

    let report = detector(dir.path()).detect(dir.path(), &from, &to).unwrap();
    assert_eq!(report.packages, vec!["example.com/test-repo/tools"]);
    assert_eq!(report.changed_modules, vec!["github.com/baz/qux"]);
}

#[test]
fn added_dependency_is_not_a_change() {
    let (dir, from) = setup_repo();
    write(
        dir.path(),
        "go.mod",
        &GO_MOD_V1.replace(")\n", "\tgithub.com/new/dep v1.0.0\n)\n"),
    );
    let to = commit(dir.path(), "add dep");

    let report = detector(dir.path()).detect(dir.path(), &from, &to).unwrap();
    assert!(report.packages.is_empty());
    assert!(report.changed_modules.is_empty());
}

#[test]
fn to_revision_need_not_be_head() {
    let (dir, from) = setup_repo();
    write(dir.path(), "main.go", "package main\n\nfunc main() {}\n");
    let to = commit(dir.path(), "main");
    write(
        dir.path(),
        "go.mod",
        &GO_MOD_V1.replace("github.com/foo/bar v1.0.0", "github.com/foo/bar v1.1.0"),
    );
    commit(dir.path(), "upgrade bar");

    let report = detector(dir.path()).detect(dir.path(), &from, &to).unwrap();
    assert_eq!(report.packages, vec!["example.com/test-repo"]);
}

#[test]
fn removed_manifest_fails_to_read() {
    let (dir, from) = setup_repo();
    fs::remove_file(dir.path().join("go.mod")).unwrap();
    let to = commit(dir.path(), "remove go.mod");

    let err = detector(dir.path()).detect(dir.path(), &from, &to).unwrap_err();
    assert!(matches!(err, DetectError::RevisionRead { .. }));
    assert!(chain(err).starts_with(&format!("reading go.mod at {}: ", to)));
}

#[test]
fn broken_manifest_fails_to_parse() {
    let (dir, _) = setup_repo();
    write(dir.path(), "go.mod", "module example.com/test-repo\n\nrequire (\n");
    let broken = commit(dir.path(), "break go.mod");
    write(dir.path(), "go.mod", GO_MOD_V1);
    let fixed = commit(dir.path(), "fix go.mod");

    let err = detector(dir.path()).detect(dir.path(), &broken, &fixed).unwrap_err();
    assert_eq!(
        chain(err),
        format!("parsing mod file go.mod at {}: go.mod:3: unterminated require block", broken)
    );
}

#[test]
fn unknown_revision_fails_listing() {
    let (dir, from) = setup_repo();

    let err = detector(dir.path())
        .detect(dir.path(), &from, "does-not-exist")
        .unwrap_err();
    assert!(chain(err).starts_with("listing changed files: running command: `git"));
}

#[test]
fn nested_module_change_propagates() {
    let (dir, from) = setup_nested_repo();
    write(dir.path(), "service/internal/store/store.go", "package store\n\nvar X = 2\n");
    let to = commit(dir.path(), "store");

    let report = module_detector(dir.path(), "service")
        .detect(&dir.path().join("service"), &from, &to)
        .unwrap();
    assert_eq!(report.changed_files, vec!["service/internal/store/store.go"]);
    assert_eq!(
        report.packages,
        vec![
            "example.com/test-repo",
            "example.com/test-repo/internal/api",
            "example.com/test-repo/internal/store",
        ]
    );
}

#[test]
fn nested_module_ignores_changes_beside_it() {
    let (dir, from) = setup_nested_repo();
    write(dir.path(), "web/app.js", "console.log('v2')\n");
    let to = commit(dir.path(), "web");

    let report = module_detector(dir.path(), "service")
        .detect(&dir.path().join("service"), &from, &to)
        .unwrap();
    assert_eq!(report.changed_files, vec!["web/app.js"]);
    assert!(report.packages.is_empty());
}

#[test]
fn nested_module_dependency_upgrade() {
    let (dir, from) = setup_nested_repo();
    write(
        dir.path(),
        "service/go.mod",
        &GO_MOD_V1.replace("github.com/foo/bar v1.0.0", "github.com/foo/bar v1.2.0"),
    );
    let to = commit(dir.path(), "upgrade bar");

    let report = module_detector(dir.path(), "service")
        .detect(&dir.path().join("service"), &from, &to)
        .unwrap();
    assert_eq!(report.changed_modules, vec!["github.com/foo/bar"]);
    assert_eq!(
        report.packages,
        vec![
            "example.com/test-repo",
            "example.com/test-repo/internal/api",
            "example.com/test-repo/internal/store",
        ]
    );
}
