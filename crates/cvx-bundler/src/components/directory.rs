use crate::errors::BundleError;
use crate::paths;
use cvx_fs::Filesystem;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFINITION_FILENAME_TS: &str = "convex.config.ts";
pub const DEFINITION_FILENAME_JS: &str = "convex.config.js";

/// Substring identifying a component definition file.
pub const DEFINITION_MARKER: &str = "convex.config";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentDirectory {
    pub is_root: bool,
    /// Absolute, normalized directory path.
    pub path: PathBuf,
    /// Absolute path of the definition file inside `path`.
    pub definition_path: PathBuf,
}

/// Why a directory is not a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotAComponent {
    Missing,
    NotADirectory,
    NoDefinition,
    DefinitionNotAFile(&'static str),
}

impl fmt::Display for NotAComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotAComponent::Missing => write!(f, "Directory doesn't exist"),
            NotAComponent::NotADirectory => write!(f, "Not a directory"),
            NotAComponent::NoDefinition => write!(
                f,
                "Directory doesn't contain a {DEFINITION_FILENAME_TS} or {DEFINITION_FILENAME_JS} file"
            ),
            NotAComponent::DefinitionNotAFile(name) => {
                write!(f, "Component definition {name} isn't a file")
            }
        }
    }
}

/// Check whether `dir` holds a component definition, preferring the `.ts` file.
pub fn is_component_directory(
    fs: &dyn Filesystem,
    dir: &Path,
    is_root: bool,
) -> Result<ComponentDirectory, NotAComponent> {
    if !fs.exists(dir) {
        return Err(NotAComponent::Missing);
    }
    let is_dir = fs.stat(dir).map(|s| s.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(NotAComponent::NotADirectory);
    }

    let dir = paths::normalize(dir);
    let (name, definition_path) = [DEFINITION_FILENAME_TS, DEFINITION_FILENAME_JS]
        .into_iter()
        .map(|name| (name, dir.join(name)))
        .find(|(_, path)| fs.exists(path))
        .ok_or(NotAComponent::NoDefinition)?;

    let is_file = fs.stat(&definition_path).map(|s| s.is_file()).unwrap_or(false);
    if !is_file {
        return Err(NotAComponent::DefinitionNotAFile(name));
    }

    Ok(ComponentDirectory {
        is_root,
        path: dir,
        definition_path,
    })
}

/// The component whose definition file is `definition_path`.
pub(crate) fn component_for_definition(
    fs: &dyn Filesystem,
    definition_path: &Path,
    root_dir: &Path,
) -> Result<ComponentDirectory, BundleError> {
    let dir = definition_path
        .parent()
        .map(paths::normalize)
        .ok_or_else(|| BundleError::fatal(format!("{} has no parent", definition_path.display())))?;
    let is_root = dir == paths::normalize(root_dir);
    is_component_directory(fs, &dir, is_root).map_err(|why| {
        BundleError::invalid_at(
            format!("Invalid component directory {}: {why}", dir.display()),
            &dir,
        )
    })
}

/// Whether the file name in `path` marks a component definition.
pub fn is_definition_file(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .is_some_and(|base| base.contains(DEFINITION_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvx_fs::TrackedFs;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_typescript_definition() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("convex.config.ts"), "export default {}").unwrap();
        fs::write(dir.path().join("convex.config.js"), "export default {}").unwrap();

        let component = is_component_directory(&TrackedFs::new(), dir.path(), true).unwrap();
        assert!(component.is_root);
        assert_eq!(component.definition_path, dir.path().join("convex.config.ts"));
    }

    #[test]
    fn test_falls_back_to_javascript_definition() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("convex.config.js"), "export default {}").unwrap();
        let component = is_component_directory(&TrackedFs::new(), dir.path(), false).unwrap();
        assert_eq!(component.definition_path, dir.path().join("convex.config.js"));
    }

    #[test]
    fn test_rejections() {
        let dir = TempDir::new().unwrap();
        let fs_impl = TrackedFs::new();
        assert_eq!(
            is_component_directory(&fs_impl, &dir.path().join("nope"), false),
            Err(NotAComponent::Missing)
        );

        fs::write(dir.path().join("file.ts"), "").unwrap();
        assert_eq!(
            is_component_directory(&fs_impl, &dir.path().join("file.ts"), false),
            Err(NotAComponent::NotADirectory)
        );

        assert_eq!(
            is_component_directory(&fs_impl, dir.path(), false),
            Err(NotAComponent::NoDefinition)
        );

        fs::create_dir(dir.path().join("convex.config.ts")).unwrap();
        assert_eq!(
            is_component_directory(&fs_impl, dir.path(), false),
            Err(NotAComponent::DefinitionNotAFile(DEFINITION_FILENAME_TS))
        );
    }

    #[test]
    fn test_definition_file_marker() {
        assert!(is_definition_file("convex/convex.config.ts"));
        assert!(is_definition_file("node_modules/x/dist/convex.config.js"));
        assert!(!is_definition_file("convex.config/helpers.ts"));
        assert!(!is_definition_file("tailwind.config.js"));
    }
}
