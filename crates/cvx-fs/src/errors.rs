use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`crate::Filesystem`] implementations
#[derive(Error, Debug)]
pub enum FsError {
    #[error("No such file or directory: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File is not valid UTF-8: {}", path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("Failed to walk directory: {0}")]
    Walk(String),
}

impl FsError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::InvalidData => FsError::InvalidUtf8 { path },
            _ => FsError::Io { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}
