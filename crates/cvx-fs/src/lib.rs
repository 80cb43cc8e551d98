//! Filesystem access for the bundling pipeline.
//!
//! Every read, listing, and stat the pipeline performs goes through the
//! [`Filesystem`] trait. [`TrackedFs`] keeps a ledger of what each path
//! looked like when it was observed so a watch loop can tell whether
//! anything that fed into a bundle has changed since.

pub mod errors;
pub mod tracked;

pub use errors::FsError;
pub use tracked::TrackedFs;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What sort of filesystem object a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Other,
}

/// The subset of metadata used for change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub kind: FileKind,
}

impl FileStat {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }
}

impl From<&std::fs::Metadata> for FileStat {
    fn from(metadata: &std::fs::Metadata) -> Self {
        let kind = if metadata.is_file() {
            FileKind::File
        } else if metadata.is_dir() {
            FileKind::Dir
        } else {
            FileKind::Other
        };
        FileStat {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            kind,
        }
    }
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// One record of a depth-first walk. `depth` is 0 for direct children of the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub depth: usize,
}

/// Filesystem operations with a change-detection contract.
///
/// Reads and listings record the observed state of the path. `register_path`
/// records a stat gathered elsewhere (for example, files a build tool read on
/// our behalf). `changed_paths` compares the ledger with the live filesystem.
pub trait Filesystem {
    fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    fn exists(&self, path: &Path) -> bool;

    fn read_utf8(&self, path: &Path) -> Result<String, FsError>;

    /// List a directory, sorted by file name.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, FsError>;

    /// Walk `root` depth-first. Directories come before their children and
    /// siblings are sorted by name, so the order is stable for an unchanged tree.
    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>, FsError>;

    fn write_utf8(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Record `stat` (or absence) as the last observed state of `path`.
    fn register_path(&self, path: &Path, stat: Option<FileStat>);

    /// Paths whose live state no longer matches the ledger.
    fn changed_paths(&self) -> Vec<PathBuf>;

    /// Every path currently in the ledger.
    fn tracked_paths(&self) -> Vec<PathBuf>;
}
