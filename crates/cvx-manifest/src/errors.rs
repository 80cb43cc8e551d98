use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading package manifests
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: cvx_fs::FsError,
    },

    #[error("Couldn't parse \"{}\". Make sure it's a valid JSON. Error: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid \"{}\". \"{key}\" version has type {found}.", path.display())]
    InvalidVersionType {
        path: PathBuf,
        key: String,
        found: &'static str,
    },

    #[error("Missing '{}', which is required for installing external package \"{name}\" configured in convex.json.", path.display())]
    MissingPackageManifest { path: PathBuf, name: String },

    #[error("'{}' does not specify a \"version\" which is required for installing external package \"{name}\" configured in convex.json.", path.display())]
    MissingVersion { path: PathBuf, name: String },
}

impl ManifestError {
    /// The file the error is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            ManifestError::Read { path, .. }
            | ManifestError::Parse { path, .. }
            | ManifestError::InvalidVersionType { path, .. }
            | ManifestError::MissingPackageManifest { path, .. }
            | ManifestError::MissingVersion { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_version_message_names_key() {
        let err = ManifestError::InvalidVersionType {
            path: PathBuf::from("/app/package.json"),
            key: "dependencies.sharp".to_string(),
            found: "number",
        };
        assert_eq!(
            err.to_string(),
            "Invalid \"/app/package.json\". \"dependencies.sharp\" version has type number."
        );
        assert_eq!(err.path(), &PathBuf::from("/app/package.json"));
    }
}
