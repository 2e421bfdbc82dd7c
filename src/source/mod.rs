//! # Sources
//!
//! Everything changed-pkgs reads from the outside world.
//!
//! | Source | Backend | Provides |
//! |--------|---------|----------|
//! | [`GitRepo`] | `git diff`, `git show` | Changed paths, file content at a revision |
//! | [`GoListLoader`] | `go list -deps -json` | Local packages in dependency order |
//! | [`gomod::parse`] | in-process | Module requirements of a go.mod |
//!
//! ## Cancellation
//!
//! Subprocesses are polled against a [`CancelToken`]; once it is cancelled
//! the running child is killed and the call fails with an "interrupted"
//! error instead of returning partial output.

mod git;
mod golist;
pub mod gomod;
mod process;

pub use git::{GitError, GitRepo, RevisionSource};
pub use golist::{GoListLoader, LoadError, PackageLoader};
pub use gomod::ManifestError;
pub use process::{run_command, CancelToken, CommandError};
