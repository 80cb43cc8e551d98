//! Locating the project a command operates on.

use anyhow::Context;
use cvx_bundler::{paths, BuildTool, BundleContext, BundleError, EsbuildCli};
use cvx_config::{find_parent_configs, ProjectConfig, UserConfig};
use cvx_fs::TrackedFs;
use cvx_logger::LogSink;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a bundling command needs to know about the project on disk.
pub struct Project {
    pub fs: TrackedFs,
    pub user_config: UserConfig,
    pub project_config: ProjectConfig,
    pub package_json: PathBuf,
    pub functions_dir: PathBuf,
}

impl Project {
    /// Find the project around the working directory.
    ///
    /// `dir` overrides the functions directory from `convex.json`; the
    /// surrounding `package.json` is then searched for from there.
    pub fn open(dir: Option<&Path>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        let user_config = UserConfig::load().context("Failed to load user config")?;
        Self::open_from(&cwd, dir, user_config)
    }

    pub fn open_from(
        cwd: &Path,
        dir: Option<&Path>,
        user_config: UserConfig,
    ) -> anyhow::Result<Self> {
        let fs = TrackedFs::new();
        let dir = dir.map(|d| paths::normalize(&cwd.join(d)));
        let start = dir.clone().unwrap_or_else(|| cwd.to_path_buf());

        let parents = find_parent_configs(&fs, &start).map_err(BundleError::from)?;
        let config_dir = parents
            .project_config
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| parents.project_dir())
            .to_path_buf();
        let project_config = ProjectConfig::load(&fs, &config_dir).map_err(BundleError::from)?;
        let functions_dir = dir.unwrap_or_else(|| project_config.functions_dir(&config_dir));
        debug!(
            "Project at {:?}, functions in {:?}",
            parents.project_dir(),
            functions_dir
        );

        Ok(Project {
            fs,
            user_config,
            project_config,
            package_json: parents.package_json,
            functions_dir,
        })
    }

    pub fn project_dir(&self) -> &Path {
        self.package_json.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn esbuild(&self) -> Result<EsbuildCli, BundleError> {
        EsbuildCli::locate(&self.user_config, self.project_dir())
    }

    pub fn context<'a>(&'a self, log: &'a dyn LogSink, tool: &'a dyn BuildTool) -> BundleContext<'a> {
        BundleContext::new(&self.fs, log, tool, &self.package_json)
    }

    /// `path` relative to the project, for display.
    pub fn display(&self, path: &Path) -> String {
        let rel = paths::to_posix(&paths::relative(self.project_dir(), path));
        if rel.is_empty() {
            ".".to_string()
        } else {
            rel
        }
    }
}
