//! Locating node project files: the nearest `package.json`, `convex.json`,
//! and the esbuild executable.

use crate::errors::ConfigError;
use crate::project_config::PROJECT_CONFIG_FILE;
use crate::user_config::UserConfig;
use cvx_fs::Filesystem;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PACKAGE_JSON_FILE: &str = "package.json";
pub const NODE_MODULES_DIR: &str = "node_modules";
pub const NODE_BIN_DIR: &str = ".bin";

#[cfg(windows)]
const ESBUILD_BIN: &str = "esbuild.cmd";
#[cfg(not(windows))]
const ESBUILD_BIN: &str = "esbuild";

/// The config files nearest to a starting directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentConfigs {
    pub package_json: PathBuf,
    pub project_config: Option<PathBuf>,
}

impl ParentConfigs {
    /// Directory holding the nearest `package.json`.
    pub fn project_dir(&self) -> &Path {
        self.package_json.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Walk upward from `start` to the nearest `package.json`.
///
/// A `convex.json` found on the way (or alongside it) is reported too.
pub fn find_parent_configs(
    fs: &dyn Filesystem,
    start: &Path,
) -> Result<ParentConfigs, ConfigError> {
    let mut project_config = None;
    for dir in start.ancestors() {
        let candidate = dir.join(PROJECT_CONFIG_FILE);
        if project_config.is_none() && fs.exists(&candidate) {
            project_config = Some(candidate);
        }
        let package_json = dir.join(PACKAGE_JSON_FILE);
        if fs.exists(&package_json) {
            debug!("Found {:?}", package_json);
            return Ok(ParentConfigs {
                package_json,
                project_config,
            });
        }
    }
    Err(ConfigError::PackageJsonNotFound(start.to_path_buf()))
}

/// Find the esbuild binary.
///
/// Order: the user config's `esbuild-path`, the project's
/// `node_modules/.bin`, then `PATH`.
pub fn resolve_esbuild_exe(
    user_config: &UserConfig,
    project_dir: &Path,
) -> Result<PathBuf, ConfigError> {
    if let Some(configured) = user_config.esbuild_path.as_deref() {
        let path = PathBuf::from(configured);
        if path.is_file() {
            return Ok(path);
        }
        debug!("Configured esbuild-path {:?} does not exist", path);
    }

    for dir in project_dir.ancestors() {
        let local = dir.join(NODE_MODULES_DIR).join(NODE_BIN_DIR).join(ESBUILD_BIN);
        if local.is_file() {
            return Ok(local);
        }
    }

    which::which("esbuild").map_err(|_| ConfigError::EsbuildNotFound)
}
