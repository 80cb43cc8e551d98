use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or locating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: cvx_fs::FsError,
    },

    #[error("Failed to parse user config: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("Failed to serialize user config: {0}")]
    SerializeToml(#[from] toml::ser::Error),

    #[error("Couldn't parse \"{}\". Make sure it's a valid JSON. Error: {message}", path.display())]
    ParseJson { path: PathBuf, message: String },

    #[error("Could not determine {0}")]
    MissingDirectory(&'static str),

    #[error("No package.json found in {} or any parent directory", .0.display())]
    PackageJsonNotFound(PathBuf),

    #[error("esbuild not found. Install it with `npm install --save-dev esbuild` or set `esbuild-path`.")]
    EsbuildNotFound,

    #[error("Unknown config key: {0}. Supported keys: esbuild-path, source-maps, extra-conditions")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
