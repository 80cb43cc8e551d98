//! Which packages a node bundle leaves external, and the exact versions the
//! runtime must install for them.

use crate::errors::ManifestError;
use crate::package_discovery::NodeModulesLocator;
use crate::package_json::PackageJson;
use cvx_fs::Filesystem;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The platform's own package. Always bundled.
pub const FIRST_PARTY_PACKAGE: &str = "convex";

const WILDCARD: &str = "*";

const LOCAL_SPEC_PREFIXES: [&str; 2] = ["file:", "git+file://"];

const URL_SPEC_PREFIXES: [&str; 6] = [
    "http://",
    "https://",
    "git://",
    "git+ssh://",
    "git+http://",
    "git+https://",
];

/// A dependency left out of the bundle and installed by the runtime instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPackage {
    pub name: String,
    pub path: PathBuf,
}

/// An external package pinned to the version found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDependency {
    pub name: String,
    pub version: String,
}

/// Whether the allow list and version spec permit leaving `name` external.
///
/// This does not check that the package is installed.
pub fn should_mark_external(name: &str, version_spec: &str, allow_list: &[String]) -> bool {
    if name == FIRST_PARTY_PACKAGE {
        return false;
    }
    if LOCAL_SPEC_PREFIXES
        .iter()
        .any(|prefix| version_spec.starts_with(prefix))
    {
        return false;
    }
    if URL_SPEC_PREFIXES
        .iter()
        .any(|prefix| version_spec.starts_with(prefix))
    {
        return false;
    }
    allow_list.iter().any(|entry| entry == name || entry == WILDCARD)
}

/// Packages from `package_json_path` that node bundles should leave external.
///
/// An empty allow list returns immediately without reading the manifest.
pub fn compute_external_packages(
    fs: &dyn Filesystem,
    package_json_path: &Path,
    allow_list: &[String],
) -> Result<BTreeMap<String, ExternalPackage>, ManifestError> {
    let mut externals = BTreeMap::new();
    if allow_list.is_empty() {
        return Ok(externals);
    }

    let manifest = PackageJson::load(fs, package_json_path)?;
    let project_dir = package_json_path.parent().unwrap_or_else(|| Path::new("."));
    let locator = NodeModulesLocator::new(project_dir);

    for (name, spec) in manifest.dependency_entries()? {
        if !should_mark_external(&name, &spec, allow_list) {
            continue;
        }
        match locator.find_installed(fs, &name) {
            Some(path) => {
                externals.insert(name.clone(), ExternalPackage { name, path });
            }
            None => debug!("'{}' is allowed external but not installed, bundling it", name),
        }
    }
    debug!("{} external package(s) available", externals.len());
    Ok(externals)
}

/// Read an installed package's own manifest for its exact version and the
/// names of its peer and optional dependencies.
pub fn find_exact_version_and_dependencies(
    fs: &dyn Filesystem,
    name: &str,
    package_dir: &Path,
) -> Result<(String, Vec<String>), ManifestError> {
    let manifest_path = package_dir.join("package.json");
    let manifest = match PackageJson::load(fs, &manifest_path) {
        Ok(manifest) => manifest,
        Err(ManifestError::Read { .. }) => {
            return Err(ManifestError::MissingPackageManifest {
                path: manifest_path,
                name: name.to_string(),
            })
        }
        Err(other) => return Err(other),
    };
    let Some(version) = manifest.version() else {
        return Err(ManifestError::MissingVersion {
            path: manifest_path,
            name: name.to_string(),
        });
    };
    Ok((version.to_string(), manifest.peer_and_optional_names()))
}

/// Pin every external the bundle referenced, plus their transitive peer and
/// optional dependencies that are themselves externalizable.
///
/// Expansion is breadth-first from `referenced`; results are in discovery order.
pub fn external_package_versions(
    fs: &dyn Filesystem,
    available: &BTreeMap<String, ExternalPackage>,
    referenced: &BTreeSet<String>,
) -> Result<Vec<NodeDependency>, ManifestError> {
    let mut queue: VecDeque<&str> = referenced
        .iter()
        .map(String::as_str)
        .filter(|name| available.contains_key(*name))
        .collect();
    let mut queued: BTreeSet<&str> = queue.iter().copied().collect();
    let mut resolved = Vec::new();

    while let Some(name) = queue.pop_front() {
        let Some(package) = available.get(name) else {
            continue;
        };
        let (version, candidates) = find_exact_version_and_dependencies(fs, name, &package.path)?;
        resolved.push(NodeDependency {
            name: name.to_string(),
            version,
        });
        for candidate in candidates {
            if let Some((key, _)) = available.get_key_value(candidate.as_str()) {
                if queued.insert(key.as_str()) {
                    queue.push_back(key.as_str());
                }
            }
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvx_fs::TrackedFs;
    use std::fs;
    use tempfile::TempDir;

    fn allow(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn install(root: &Path, name: &str, manifest: &str) {
        let dir = root.join("node_modules").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
    }

    #[test]
    fn test_should_mark_external_rules() {
        let all = allow(&["*"]);
        assert!(should_mark_external("sharp", "^0.33.0", &all));
        assert!(!should_mark_external("convex", "^1.0.0", &all));
        assert!(!should_mark_external("local", "file:../local", &all));
        assert!(!should_mark_external("linked", "git+file:///repo", &all));
        assert!(!should_mark_external("remote", "https://example.com/x.tgz", &all));
        assert!(!should_mark_external("remote", "git+ssh://git@host/x.git", &all));

        let some = allow(&["sharp"]);
        assert!(should_mark_external("sharp", "1.0.0", &some));
        assert!(!should_mark_external("lodash", "1.0.0", &some));
        assert!(!should_mark_external("sharp", "file:./vendor/sharp", &some));
    }

    #[test]
    fn test_empty_allow_list_skips_manifest() {
        let dir = TempDir::new().unwrap();
        let result = compute_external_packages(
            &TrackedFs::new(),
            &dir.path().join("package.json"),
            &[],
        )
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_compute_requires_installation() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"sharp": "^0.33.0", "ghost": "1.0.0", "convex": "^1.0.0", "mine": "file:../mine"}}"#,
        )
        .unwrap();
        install(dir.path(), "sharp", r#"{"version": "0.33.2"}"#);
        install(dir.path(), "convex", r#"{"version": "1.0.0"}"#);
        install(dir.path(), "mine", r#"{"version": "0.0.1"}"#);

        let result = compute_external_packages(
            &TrackedFs::new(),
            &dir.path().join("package.json"),
            &allow(&["*"]),
        )
        .unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["sharp"]);
        assert_eq!(result["sharp"].path, dir.path().join("node_modules/sharp"));
    }

    #[test]
    fn test_versions_expand_peers_breadth_first() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"a": "1", "b": "1", "c": "1", "unrelated": "1"}}"#,
        )
        .unwrap();
        install(dir.path(), "a", r#"{"version": "1.0.0", "peerDependencies": {"b": "*", "zzz": "*"}}"#);
        install(dir.path(), "b", r#"{"version": "2.0.0", "optionalDependencies": {"c": "*", "a": "*"}}"#);
        install(dir.path(), "c", r#"{"version": "3.0.0"}"#);
        install(dir.path(), "unrelated", r#"{"version": "9.9.9"}"#);

        let fs_impl = TrackedFs::new();
        let available =
            compute_external_packages(&fs_impl, &dir.path().join("package.json"), &allow(&["*"]))
                .unwrap();
        let referenced: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        let versions = external_package_versions(&fs_impl, &available, &referenced).unwrap();

        assert_eq!(
            versions,
            vec![
                NodeDependency { name: "a".into(), version: "1.0.0".into() },
                NodeDependency { name: "b".into(), version: "2.0.0".into() },
                NodeDependency { name: "c".into(), version: "3.0.0".into() },
            ]
        );
    }

    #[test]
    fn test_missing_version_is_reported() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), "noversion", r#"{"name": "noversion"}"#);
        let err = find_exact_version_and_dependencies(
            &TrackedFs::new(),
            "noversion",
            &dir.path().join("node_modules/noversion"),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingVersion { .. }));

        let err = find_exact_version_and_dependencies(
            &TrackedFs::new(),
            "absent",
            &dir.path().join("node_modules/absent"),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingPackageManifest { .. }));
    }
}
