//! Domain models for changed-pkgs
//!
//! Contains the package graph and the change propagation algorithm, without
//! any I/O concerns.

mod graph;
mod impact;
mod manifest;
mod package;

pub use graph::{GraphError, PackageGraph};
pub use impact::{compute_impacted_packages, ImpactEngine, ImpactEvent, ImpactSet};
pub use manifest::{Manifest, ManifestDelta, ModuleRequirement};
pub use package::{ImportedPackage, LocalPackage, ModuleRef};
