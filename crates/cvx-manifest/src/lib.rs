//! Node package manifests
//!
//! Reads `package.json` files, locates installed packages under
//! `node_modules`, and decides which packages stay external to a bundle.

pub mod errors;
pub mod external;
pub mod package_discovery;
pub mod package_json;

pub use errors::ManifestError;
pub use external::{
    compute_external_packages, external_package_versions, find_exact_version_and_dependencies,
    should_mark_external, ExternalPackage, NodeDependency, FIRST_PARTY_PACKAGE,
};
pub use package_discovery::{module_of, NodeModulesLocator};
pub use package_json::{PackageJson, DEPENDENCY_SECTIONS};
