//! changed-pkgs - find the Go packages affected by a change
//!
//! Given two git revisions, lists the packages of a Go module that are
//! affected by the difference: packages whose files changed, packages
//! importing a third-party module whose required version changed, and every
//! package that imports one of those, directly or transitively. Meant for
//! selecting what to test or build in CI.

pub mod cli;
pub mod detect;
pub mod domain;
pub mod source;

pub use detect::{ChangeDetector, DetectError, ImpactReport};
pub use domain::{compute_impacted_packages, ImpactSet, ManifestDelta, PackageGraph};
