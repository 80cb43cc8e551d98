use crate::errors::ManifestError;
use cvx_fs::Filesystem;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Dependency sections consulted for externalization, in priority order.
pub const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// A parsed `package.json`.
///
/// Kept as raw JSON so malformed entries can be reported with the exact key
/// that is wrong instead of failing the whole document.
#[derive(Debug, Clone)]
pub struct PackageJson {
    path: PathBuf,
    raw: Map<String, Value>,
}

impl PackageJson {
    pub fn load(fs: &dyn Filesystem, path: &Path) -> Result<Self, ManifestError> {
        let contents = fs.read_utf8(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(contents).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let Value::Object(raw) = value else {
            return Err(ManifestError::Parse {
                path: path.to_path_buf(),
                message: format!("expected an object, found {}", json_type_name(&value)),
            });
        };
        Ok(PackageJson {
            path: path.to_path_buf(),
            raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.raw.get("version").and_then(Value::as_str)
    }

    /// `(name, version spec)` pairs across all dependency sections.
    ///
    /// Sections are scanned in [`DEPENDENCY_SECTIONS`] order and the first
    /// occurrence of a name wins. A version that is not a string is an error.
    pub fn dependency_entries(&self) -> Result<Vec<(String, String)>, ManifestError> {
        let mut entries: Vec<(String, String)> = Vec::new();
        for section in DEPENDENCY_SECTIONS {
            let Some(Value::Object(deps)) = self.raw.get(section) else {
                continue;
            };
            for (name, spec) in deps {
                let Value::String(spec) = spec else {
                    return Err(ManifestError::InvalidVersionType {
                        path: self.path.clone(),
                        key: format!("{section}.{name}"),
                        found: json_type_name(spec),
                    });
                };
                if entries.iter().any(|(seen, _)| seen == name) {
                    continue;
                }
                entries.push((name.clone(), spec.clone()));
            }
        }
        Ok(entries)
    }

    /// Names listed under `peerDependencies` and `optionalDependencies`.
    pub fn peer_and_optional_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for section in ["peerDependencies", "optionalDependencies"] {
            if let Some(Value::Object(deps)) = self.raw.get(section) {
                for name in deps.keys() {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }
}

/// Type names as JavaScript's `typeof` reports them.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}
