use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the user config location.
pub const CONFIG_ENV_VAR: &str = "CVX_CONFIG";

/// Pointer file next to the default config that redirects to another location.
const CONFIG_POINTER_FILE: &str = ".cvx_config_path";

/// Per-user tool preferences stored in `cvx.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct UserConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub esbuild_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_maps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_conditions: Option<Vec<String>>,
}

impl UserConfig {
    /// Resolve the config file location.
    ///
    /// `$CVX_CONFIG` wins when set and non-empty. Otherwise the default
    /// location is used, unless a pointer file next to it names another path.
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let default = Self::default_path()?;
        if let Some(pointer) = default.parent().map(|p| p.join(CONFIG_POINTER_FILE)) {
            if let Ok(contents) = fs::read_to_string(&pointer) {
                let trimmed = contents.trim();
                if !trimmed.is_empty() {
                    return Ok(PathBuf::from(trimmed));
                }
            }
        }

        Ok(default)
    }

    fn default_path() -> Result<PathBuf, ConfigError> {
        #[cfg(not(target_os = "windows"))]
        let default = dirs::home_dir()
            .ok_or(ConfigError::MissingDirectory("home directory"))?
            .join(".config")
            .join("cvx")
            .join("cvx.toml");

        #[cfg(target_os = "windows")]
        let default = dirs::config_dir()
            .ok_or(ConfigError::MissingDirectory("config directory"))?
            .join("cvx")
            .join("cvx.toml");

        Ok(default)
    }

    /// Point future runs at `new_path` by writing the pointer file.
    pub fn set_path(new_path: &Path) -> Result<PathBuf, ConfigError> {
        let default = Self::default_path()?;
        let dir = default
            .parent()
            .ok_or(ConfigError::MissingDirectory("config directory"))?;
        fs::create_dir_all(dir)?;
        let pointer = dir.join(CONFIG_POINTER_FILE);
        fs::write(&pointer, new_path.to_string_lossy().as_bytes())?;
        Ok(pointer)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(UserConfig::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "esbuild-path" => self.esbuild_path.clone(),
            "source-maps" => self.source_maps.map(|v| v.to_string()),
            "extra-conditions" => self.extra_conditions.as_ref().map(|c| c.join(",")),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "esbuild-path" => self.esbuild_path = Some(value.to_string()),
            "source-maps" => {
                let parsed = value.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
                self.source_maps = Some(parsed);
            }
            "extra-conditions" => {
                let conditions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                self.extra_conditions = Some(conditions);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.esbuild_path.is_none() && self.source_maps.is_none() && self.extra_conditions.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&str, String)> {
        ["esbuild-path", "source-maps", "extra-conditions"]
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }

    /// Source maps are on unless explicitly disabled.
    pub fn source_maps_enabled(&self) -> bool {
        self.source_maps.unwrap_or(true)
    }

    pub fn extra_conditions(&self) -> Vec<String> {
        self.extra_conditions.clone().unwrap_or_default()
    }
}
