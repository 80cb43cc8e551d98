use crate::errors::BundleError;
use crate::paths;
use cvx_fs::{Filesystem, WalkEntry};
use std::path::{Path, PathBuf};

/// A deterministic depth-first listing of a functions directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub root: PathBuf,
    pub entries: Vec<WalkEntry>,
}

impl SourceTree {
    pub fn walk(fs: &dyn Filesystem, root: &Path) -> Result<Self, BundleError> {
        let entries = fs.walk(root).map_err(|e| {
            if e.is_not_found() {
                BundleError::invalid_at(
                    format!("Functions directory {} does not exist", root.display()),
                    root,
                )
            } else {
                BundleError::fatal(e.to_string())
            }
        })?;
        Ok(SourceTree {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Files only, in walk order.
    pub fn files(&self) -> impl Iterator<Item = &WalkEntry> {
        self.entries.iter().filter(|e| !e.is_dir)
    }

    /// Posix path of `path` relative to the tree root.
    pub fn rel_path(&self, path: &Path) -> String {
        paths::to_posix(&paths::relative(&self.root, path))
    }
}
