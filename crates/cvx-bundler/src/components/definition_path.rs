use super::directory::ComponentDirectory;
use crate::errors::BundleError;
use crate::paths;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of the import specifier that stands in for another component.
pub const COMPONENT_DEPS_PREFIX: &str = "./_componentDeps/";

/// A component's directory relative to the root component's directory, in
/// posix form. The root itself is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentDefinitionPath(String);

impl ComponentDefinitionPath {
    pub fn new(path: impl Into<String>) -> Self {
        ComponentDefinitionPath(path.into())
    }

    pub fn root() -> Self {
        ComponentDefinitionPath(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ComponentDefinitionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn to_definition_path(
    root: &ComponentDirectory,
    component: &ComponentDirectory,
) -> ComponentDefinitionPath {
    ComponentDefinitionPath(paths::to_posix(&paths::relative(&root.path, &component.path)))
}

/// The specifier an import of `path` is rewritten to.
///
/// The path's UTF-8 bytes are base64 encoded with the URL-safe alphabet
/// (`-` and `_` in place of `+` and `/`) and no `=` padding.
pub fn encode_definition_import(path: &ComponentDefinitionPath) -> String {
    format!(
        "{COMPONENT_DEPS_PREFIX}{}",
        URL_SAFE_NO_PAD.encode(path.as_str().as_bytes())
    )
}

/// Invert [`encode_definition_import`].
///
/// Input must use the URL-safe alphabet; trailing `=` padding is accepted
/// and ignored.
pub fn decode_definition_import(import: &str) -> Result<ComponentDefinitionPath, BundleError> {
    let encoded = import
        .strip_prefix(COMPONENT_DEPS_PREFIX)
        .or_else(|| import.strip_prefix(&COMPONENT_DEPS_PREFIX[2..]))
        .ok_or_else(|| BundleError::fatal(format!("{import} is not a component reference")))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| BundleError::fatal(format!("Invalid component reference {import}: {e}")))?;
    let path = String::from_utf8(bytes)
        .map_err(|e| BundleError::fatal(format!("Invalid component reference {import}: {e}")))?;
    Ok(ComponentDefinitionPath(path))
}
