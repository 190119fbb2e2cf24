//! Dependency handling - manifests, version constraints, environment
//! inspection and the resolver built on top of them

mod environment;
mod memory;
mod requirement;
mod resolver;
mod version;

pub use environment::{
    CommandEnvironment, EXTERNALLY_MANAGED_MARKER, InstallAttempt, InstalledPackages, PackageEnvironment,
    parse_package_list,
};
pub use memory::MemoryEnvironment;
pub use requirement::{Requirement, load_manifest, normalize_name, parse_manifest};
pub use resolver::{
    CheckStatus, DependencyCheck, DependencyReport, DependencyResolver, InstallReport, install_hint,
};
pub use version::{Clause, Operator, Version, VersionSpec};
