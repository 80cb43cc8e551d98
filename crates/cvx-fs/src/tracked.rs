use crate::{DirEntryInfo, FileStat, Filesystem, FsError, WalkEntry};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Real-disk [`Filesystem`] that records everything it observes.
#[derive(Debug, Default)]
pub struct TrackedFs {
    ledger: Mutex<BTreeMap<PathBuf, Option<FileStat>>>,
}

impl TrackedFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_stat(path: &Path) -> Option<FileStat> {
        fs::metadata(path).ok().map(|m| FileStat::from(&m))
    }

    fn record(&self, path: &Path, stat: Option<FileStat>) {
        self.ledger.lock().insert(path.to_path_buf(), stat);
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.ledger.lock().clear();
    }
}

impl Filesystem for TrackedFs {
    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let metadata = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        Ok(FileStat::from(&metadata))
    }

    fn exists(&self, path: &Path) -> bool {
        let stat = Self::live_stat(path);
        self.record(path, stat);
        stat.is_some()
    }

    fn read_utf8(&self, path: &Path) -> Result<String, FsError> {
        let stat = self.stat(path)?;
        let contents = fs::read_to_string(path).map_err(|e| FsError::from_io(path, e))?;
        self.record(path, Some(stat));
        Ok(contents)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, FsError> {
        let stat = self.stat(path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| FsError::from_io(path, e))? {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        self.record(path, Some(stat));
        Ok(entries)
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>, FsError> {
        let root_stat = self.stat(root)?;
        self.record(root, Some(root_stat));

        let mut entries = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| FsError::Walk(e.to_string()))?;
            let is_dir = entry.file_type().is_dir();
            if is_dir {
                let stat = Self::live_stat(entry.path());
                self.record(entry.path(), stat);
            }
            entries.push(WalkEntry {
                path: entry.path().to_path_buf(),
                is_dir,
                depth: entry.depth() - 1,
            });
        }
        debug!("Walked {} entries under {:?}", entries.len(), root);
        Ok(entries)
    }

    fn write_utf8(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| FsError::from_io(path, e))?;
        self.record(path, Self::live_stat(path));
        Ok(())
    }

    fn register_path(&self, path: &Path, stat: Option<FileStat>) {
        self.record(path, stat);
    }

    fn changed_paths(&self) -> Vec<PathBuf> {
        self.ledger
            .lock()
            .iter()
            .filter(|(path, recorded)| Self::live_stat(path) != **recorded)
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn tracked_paths(&self) -> Vec<PathBuf> {
        self.ledger.lock().keys().cloned().collect()
    }
}
