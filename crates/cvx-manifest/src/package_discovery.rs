use cvx_fs::Filesystem;
use std::path::{Path, PathBuf};
use tracing::debug;

const NODE_MODULES: &str = "node_modules";

/// Resolve installed package directories under `node_modules`.
#[derive(Debug, Clone)]
pub struct NodeModulesLocator {
    root: PathBuf,
}

impl NodeModulesLocator {
    /// Create a locator for the project whose `package.json` lives in `project_dir`.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        NodeModulesLocator {
            root: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.root
    }

    /// Where `package` would be installed for this project.
    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.root.join(NODE_MODULES).join(package)
    }

    /// The installed directory of `package`, if present.
    pub fn find_installed(&self, fs: &dyn Filesystem, package: &str) -> Option<PathBuf> {
        let dir = self.package_dir(package);
        if fs.exists(&dir) {
            Some(dir)
        } else {
            debug!("Package '{}' not installed at {:?}", package, dir);
            None
        }
    }

    /// Resolve a bare specifier the way node does: look in `node_modules` of
    /// `from_dir` and each of its ancestors. Returns the resolved file path if
    /// the specifier names an existing file or directory.
    pub fn resolve_bare(fs: &dyn Filesystem, from_dir: &Path, specifier: &str) -> Option<PathBuf> {
        from_dir
            .ancestors()
            .map(|dir| dir.join(NODE_MODULES).join(specifier))
            .find(|candidate| fs.exists(candidate))
    }
}

/// The package name an import specifier refers to.
///
/// `@scope/pkg/sub/path` gives `@scope/pkg`, `pkg/sub` gives `pkg`. Relative
/// and absolute paths are not packages and give `None`.
pub fn module_of(specifier: &str) -> Option<&str> {
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.contains(':')
    {
        return None;
    }
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next()?;
    if first.starts_with('@') {
        let second = parts.next().filter(|s| !s.is_empty())?;
        Some(&specifier[..first.len() + 1 + second.len()])
    } else {
        Some(first)
    }
}
