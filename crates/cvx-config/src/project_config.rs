use crate::errors::ConfigError;
use cvx_fs::Filesystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PROJECT_CONFIG_FILE: &str = "convex.json";
pub const DEFAULT_FUNCTIONS_DIR: &str = "convex/";

/// Settings for the node environment.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Package names (or `*`) left unbundled in node bundles.
    #[serde(default)]
    pub external_packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
}

/// Project-level settings from `convex.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default = "default_functions")]
    pub functions: String,
    #[serde(default)]
    pub node: NodeConfig,
}

fn default_functions() -> String {
    DEFAULT_FUNCTIONS_DIR.to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            functions: default_functions(),
            node: NodeConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load `convex.json` from `project_dir`. A missing file yields defaults.
    pub fn load(fs: &dyn Filesystem, project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(PROJECT_CONFIG_FILE);
        if !fs.exists(&path) {
            debug!("No {} in {:?}, using defaults", PROJECT_CONFIG_FILE, project_dir);
            return Ok(ProjectConfig::default());
        }
        let contents = fs.read_utf8(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::ParseJson {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Absolute functions directory for a project rooted at `project_dir`.
    pub fn functions_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(self.functions.trim_end_matches('/'))
    }

    pub fn external_packages(&self) -> &[String] {
        &self.node.external_packages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvx_fs::TrackedFs;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load(&TrackedFs::new(), dir.path()).unwrap();
        assert_eq!(config.functions, "convex/");
        assert!(config.external_packages().is_empty());
        assert_eq!(config.functions_dir(dir.path()), dir.path().join("convex"));
    }

    #[test]
    fn test_loads_node_settings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("convex.json"),
            r#"{"functions": "src/convex/", "node": {"externalPackages": ["sharp", "*"], "nodeVersion": "20"}}"#,
        )
        .unwrap();
        let config = ProjectConfig::load(&TrackedFs::new(), dir.path()).unwrap();
        assert_eq!(config.functions_dir(dir.path()), dir.path().join("src/convex"));
        assert_eq!(config.external_packages(), ["sharp", "*"]);
        assert_eq!(config.node.node_version.as_deref(), Some("20"));
    }

    #[test]
    fn test_invalid_json_is_reported_with_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("convex.json"), "{ functions: ").unwrap();
        let err = ProjectConfig::load(&TrackedFs::new(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson { .. }));
        assert!(err.to_string().contains("Make sure it's a valid JSON"));
    }
}
