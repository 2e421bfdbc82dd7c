//! Git access: changed paths between two revisions and file contents at a revision

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use super::process::{run_command, CancelToken, CommandError};

#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Command(CommandError),

    #[error("interrupted")]
    Cancelled,
}

impl From<CommandError> for GitError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Cancelled => GitError::Cancelled,
            other => GitError::Command(other),
        }
    }
}

/// Read access to the revisions of a repository
pub trait RevisionSource {
    /// Paths, relative to the repository root, that differ between two revisions
    fn list_changed_files(&self, from: &str, to: &str) -> Result<Vec<String>, GitError>;

    /// Full text of `path` (relative to the repository root) as of `rev`
    fn read_file_at_revision(&self, path: &str, rev: &str) -> Result<String, GitError>;
}

/// A git repository driven through the `git` command
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
    git: PathBuf,
    cancel: CancelToken,
}

impl GitRepo {
    /// Opens the repository at `root`, which should be absolute
    pub fn new(root: impl Into<PathBuf>, cancel: CancelToken) -> Self {
        Self {
            root: root.into(),
            git: PathBuf::from("git"),
            cancel,
        }
    }

    /// Uses a specific git executable
    pub fn with_binary(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new(&self.git);
        cmd.arg("-C").arg(&self.root).args(args);
        Ok(run_command(cmd, &self.cancel)?)
    }
}

/// Splits NUL-terminated `git diff -z` output
fn split_nul_terminated(out: &str) -> Vec<String> {
    out.split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

impl RevisionSource for GitRepo {
    fn list_changed_files(&self, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let out = self.run(&["diff", "--name-only", "-z", from, to])?;
        Ok(split_nul_terminated(&out))
    }

    fn read_file_at_revision(&self, path: &str, rev: &str) -> Result<String, GitError> {
        self.run(&["show", &format!("{}:{}", rev, path)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_diff_output() {
        assert_eq!(
            split_nul_terminated("a/a.go\0b with space/b.go\0go.mod\0"),
            vec!["a/a.go", "b with space/b.go", "go.mod"]
        );
    }

    #[test]
    fn empty_diff_has_no_paths() {
        assert!(split_nul_terminated("").is_empty());
    }

    #[test]
    fn cancelled_command_maps_to_cancelled() {
        assert!(matches!(GitError::from(CommandError::Cancelled), GitError::Cancelled));
    }

    #[test]
    fn outside_a_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = GitRepo::new(dir.path(), CancelToken::new());

        let err = repo.list_changed_files("HEAD~1", "HEAD").unwrap_err();
        assert!(err.to_string().starts_with("running command: `git -C "));
    }
}
