use cvx_config::ConfigError;
use cvx_manifest::ManifestError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// How the caller should react to a failed bundling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The project's files are wrong. Wait for an edit before retrying.
    InvalidFilesystemData,
    /// The filesystem changed under a build. Retrying is safe.
    Transient,
    /// An internal invariant broke or the configuration is unsupported.
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFilesystemData => "invalid filesystem data",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only error type that leaves the bundling core.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("{message}")]
    InvalidFilesystemData {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Transient { message: String },

    #[error("{message}")]
    Fatal { message: String },
}

impl BundleError {
    pub fn invalid(message: impl Into<String>) -> Self {
        BundleError::InvalidFilesystemData {
            message: message.into(),
            path: None,
        }
    }

    pub fn invalid_at(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        BundleError::InvalidFilesystemData {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        BundleError::Transient {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        BundleError::Fatal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::InvalidFilesystemData { .. } => ErrorKind::InvalidFilesystemData,
            BundleError::Transient { .. } => ErrorKind::Transient,
            BundleError::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// The offending file, when the error is about one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            BundleError::InvalidFilesystemData { path, .. } => path.as_ref(),
            _ => None,
        }
    }
}

impl From<ManifestError> for BundleError {
    fn from(err: ManifestError) -> Self {
        let path = err.path().clone();
        BundleError::invalid_at(err.to_string(), path)
    }
}

impl From<ConfigError> for BundleError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ParseJson { ref path, .. } => {
                let path = path.clone();
                BundleError::invalid_at(err.to_string(), path)
            }
            ConfigError::Read { ref path, .. } => {
                let path = path.clone();
                BundleError::invalid_at(err.to_string(), path)
            }
            ConfigError::PackageJsonNotFound(_) => BundleError::invalid(err.to_string()),
            other => BundleError::fatal(other.to_string()),
        }
    }
}

/// Reading a file the classifier already saw listed.
pub(crate) fn read_error(err: cvx_fs::FsError) -> BundleError {
    match err {
        // Listed a moment ago, gone now.
        cvx_fs::FsError::NotFound { .. } => BundleError::transient(err.to_string()),
        cvx_fs::FsError::InvalidUtf8 { ref path } => {
            let path = path.clone();
            BundleError::invalid_at(err.to_string(), path)
        }
        other => BundleError::fatal(other.to_string()),
    }
}
