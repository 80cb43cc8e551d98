//! The seam between the pipeline and the JavaScript build tool.
//!
//! Operations describe a build with [`BuildOptions`] and a list of
//! [`ResolveHook`]s; a [`BuildTool`] runs it and reports the emitted files
//! together with a [`Metafile`] of every input it consumed.

use crate::errors::BundleError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const OUTPUT_FORMAT: &str = "esm";
pub const TARGET: &str = "esnext";
pub const BASE_CONDITIONS: [&str; 2] = ["convex", "module"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Browser,
    Node,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Browser => "browser",
            Platform::Node => "node",
        }
    }
}

/// Minification switches. Whitespace stays unminified so source-map line
/// mappings survive downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minify {
    pub syntax: bool,
    pub identifiers: bool,
    pub whitespace: bool,
}

impl Default for Minify {
    fn default() -> Self {
        Minify {
            syntax: true,
            identifiers: true,
            whitespace: false,
        }
    }
}

/// A fully specified build. Output is always ESM targeting `esnext`, kept in
/// memory, with a metafile.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub entry_points: Vec<PathBuf>,
    pub working_dir: PathBuf,
    /// Output paths mirror input paths relative to this directory.
    pub outbase: PathBuf,
    pub platform: Platform,
    pub source_maps: bool,
    pub splitting: bool,
    /// Chunk naming template, e.g. `_deps/[hash]`.
    pub chunk_names: Option<String>,
    pub tree_shaking: bool,
    pub minify: Minify,
    pub keep_names: bool,
    pub conditions: Vec<String>,
    pub define: Vec<(String, String)>,
    pub jsx_automatic: bool,
}

impl BuildOptions {
    pub fn new(
        entry_points: Vec<PathBuf>,
        working_dir: PathBuf,
        outbase: PathBuf,
        platform: Platform,
    ) -> Self {
        BuildOptions {
            entry_points,
            working_dir,
            outbase,
            platform,
            source_maps: true,
            splitting: true,
            chunk_names: None,
            tree_shaking: true,
            minify: Minify::default(),
            keep_names: true,
            conditions: BASE_CONDITIONS.iter().map(|c| (*c).to_string()).collect(),
            define: vec![(
                "process.env.NODE_ENV".to_string(),
                "\"production\"".to_string(),
            )],
            jsx_automatic: true,
        }
    }

    pub fn with_extra_conditions(mut self, extra: &[String]) -> Self {
        self.conditions.extend(extra.iter().cloned());
        self
    }
}

/// How an import reached the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveKind {
    EntryPoint,
    ImportStatement,
    RequireCall,
    DynamicImport,
    RequireResolve,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone)]
pub struct ResolveArgs {
    /// The specifier as written (absolute for entry points).
    pub path: String,
    /// File containing the import; empty for entry points.
    pub importer: String,
    pub resolve_dir: PathBuf,
    pub kind: ResolveKind,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Let the tool (or the next hook) resolve it.
    None,
    /// Resolve to this file and bundle it.
    Path(PathBuf),
    /// Leave the import in the output, rewritten to this specifier.
    External(String),
}

/// How much of a hook's behaviour is known before the build starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookPlan {
    /// Only marks these packages (and their subpaths) external.
    Externals(Vec<String>),
    /// Decisions depend on each import; the tool must consult the hook.
    Dynamic,
}

/// A resolution callback, modelled on build-tool plugins.
pub trait ResolveHook {
    fn name(&self) -> &str;

    /// Specifiers the hook wants to see. `None` means all of them.
    fn filter(&self) -> Option<&Regex>;

    fn plan(&self) -> HookPlan;

    fn on_resolve(&mut self, args: &ResolveArgs) -> Result<ResolveOutcome, BundleError>;

    fn wants(&self, specifier: &str) -> bool {
        self.filter().map_or(true, |re| re.is_match(specifier))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Relative to the output directory.
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

/// An error or warning reported by the build tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            ..Message::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafileImport {
    pub path: String,
    pub kind: ResolveKind,
    #[serde(default)]
    pub external: bool,
    /// The specifier as written, when the tool reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafileInput {
    pub bytes: u64,
    #[serde(default)]
    pub imports: Vec<MetafileImport>,
}

/// The build tool's record of consumed inputs, keyed by path relative to the
/// working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafile {
    #[serde(default)]
    pub inputs: BTreeMap<String, MetafileInput>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub output_files: Vec<OutputFile>,
    pub metafile: Metafile,
    pub errors: Vec<Message>,
    pub warnings: Vec<Message>,
}

/// A build the tool gave up on, with the same message shape as [`BuildOutput`].
#[derive(Debug, Clone, Default)]
pub struct BuildFailure {
    pub errors: Vec<Message>,
    pub warnings: Vec<Message>,
}

#[derive(Debug)]
pub enum BuildError {
    /// The tool reported failure.
    Failed(BuildFailure),
    /// A hook or the tool's own plumbing aborted the build.
    Aborted(BundleError),
}

impl From<BundleError> for BuildError {
    fn from(err: BundleError) -> Self {
        BuildError::Aborted(err)
    }
}

pub trait BuildTool {
    fn build(
        &self,
        options: &BuildOptions,
        hooks: &mut [&mut dyn ResolveHook],
    ) -> Result<BuildOutput, BuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_options() {
        let options = BuildOptions::new(
            vec![PathBuf::from("/p/convex/a.ts")],
            PathBuf::from("/p"),
            PathBuf::from("/p/convex"),
            Platform::Browser,
        )
        .with_extra_conditions(&["worker".to_string()]);
        assert_eq!(options.conditions, vec!["convex", "module", "worker"]);
        assert!(!options.minify.whitespace);
        assert!(options.minify.identifiers && options.keep_names);
        assert!(options.splitting && options.tree_shaking && options.jsx_automatic);
    }

    #[test]
    fn test_metafile_parses_tool_json() {
        let json = r#"{
            "inputs": {
                "convex/a.ts": {"bytes": 120, "imports": [
                    {"path": "convex/lib.ts", "kind": "import-statement", "original": "./lib"},
                    {"path": "sharp", "kind": "import-statement", "external": true},
                    {"path": "<runtime>", "kind": "url-token"}
                ]},
                "convex/lib.ts": {"bytes": 40, "imports": [], "format": "esm"}
            },
            "outputs": {}
        }"#;
        let metafile: Metafile = serde_json::from_str(json).unwrap();
        let a = &metafile.inputs["convex/a.ts"];
        assert_eq!(a.bytes, 120);
        assert_eq!(a.imports[0].original.as_deref(), Some("./lib"));
        assert!(a.imports[1].external);
        assert_eq!(a.imports[2].kind, ResolveKind::Other);
    }
}
