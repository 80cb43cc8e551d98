use crate::build_tool::BuildTool;
use cvx_fs::Filesystem;
use cvx_logger::LogSink;
use std::path::{Path, PathBuf};

/// Everything a bundling run needs from its surroundings.
///
/// Owned by the caller (a CLI session, a test) and passed by reference into
/// every operation, so the core holds no global state.
pub struct BundleContext<'a> {
    pub fs: &'a dyn Filesystem,
    pub log: &'a dyn LogSink,
    pub tool: &'a dyn BuildTool,
    /// Working directory handed to the build tool. Metafile paths are relative to it.
    pub project_dir: PathBuf,
    /// The nearest `package.json`, consulted for external packages.
    pub package_json: PathBuf,
}

impl<'a> BundleContext<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        log: &'a dyn LogSink,
        tool: &'a dyn BuildTool,
        package_json: impl Into<PathBuf>,
    ) -> Self {
        let package_json = package_json.into();
        let project_dir = package_json
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        BundleContext {
            fs,
            log,
            tool,
            project_dir,
            package_json,
        }
    }

    /// Resolve a path reported by the build tool against the working directory.
    pub fn absolute(&self, reported: &str) -> PathBuf {
        crate::paths::normalize(&self.project_dir.join(reported))
    }
}
