//! Deciding which files in a functions directory are bundled as entry points.

use crate::context::BundleContext;
use crate::errors::{read_error, BundleError};
use crate::source_tree::SourceTree;
use cvx_ast::{has_module_syntax, imports_http_router, SourceLanguage};
use cvx_logger::DiagnosticEvent;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENTRY_POINT_EXTENSIONS: [&str; 8] =
    ["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts"];

/// Directory reserved for shared chunks emitted by the bundler.
pub const DEPS_DIR: &str = "_deps";
pub const GENERATED_DIR: &str = "_generated";

/// Logical names bundled as entry points but not registered as functions.
const RESERVED_ENTRY_POINTS: [&str; 2] = ["http", "crons"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointKind {
    /// A module exporting functions.
    Function,
    /// `http` or `crons`: bundled, but consumed by the platform rather than called.
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub path: PathBuf,
    /// Posix path relative to the functions directory.
    pub rel_path: String,
    pub kind: EntryPointKind,
}

impl EntryPoint {
    pub fn is_function(&self) -> bool {
        self.kind == EntryPointKind::Function
    }
}

/// Walk `dir` and classify it.
pub fn entry_points(ctx: &BundleContext<'_>, dir: &Path) -> Result<Vec<EntryPoint>, BundleError> {
    let tree = SourceTree::walk(ctx.fs, dir)?;
    classify(ctx, &tree)
}

/// Classify every file of `tree`, preserving walk order.
pub fn classify(ctx: &BundleContext<'_>, tree: &SourceTree) -> Result<Vec<EntryPoint>, BundleError> {
    let mut candidates = Vec::new();
    let mut warned_https = false;

    for entry in tree.files() {
        let rel_path = tree.rel_path(&entry.path);
        let base = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if rel_path.starts_with(&format!("{DEPS_DIR}/")) {
            return Err(BundleError::invalid_at(
                format!(
                    "The path \"{}\" is within the \"{DEPS_DIR}\" directory, which is reserved for dependencies. Please move your code to another directory.",
                    entry.path.display()
                ),
                &entry.path,
            ));
        }

        if entry.depth == 0 && base.to_lowercase().starts_with("https.") && !warned_https {
            if let Some(language) = language_of(&entry.path) {
                let source = ctx.fs.read_utf8(&entry.path).map_err(read_error)?;
                if imports_http_router(&source, language) {
                    warned_https = true;
                    let ext = entry
                        .path
                        .extension()
                        .map(|e| e.to_string_lossy().to_string())
                        .unwrap_or_default();
                    ctx.log.warning(&format!(
                        "Found {}. HTTP action routes will not be imported from this file. Did you mean to include http.{ext}?",
                        entry.path.display()
                    ));
                    ctx.log.capture(DiagnosticEvent::warning(format!(
                        "User code top level directory contains file {base} which imports httpRouter."
                    )));
                }
            }
        }

        if let Some(reason) = exclusion_reason(&rel_path, &base) {
            ctx.log
                .verbose(&format!("Skipping {}: {reason}", entry.path.display()));
            continue;
        }

        ctx.log.verbose(&format!("Preparing {}", entry.path.display()));
        candidates.push(entry.path.clone());
    }

    let mut entry_points = Vec::with_capacity(candidates.len());
    for path in candidates {
        if is_typescript(&path) {
            let source = ctx.fs.read_utf8(&path).map_err(read_error)?;
            if !has_module_syntax(&source) {
                ctx.log.verbose(&format!(
                    "Skipping {} because it has no export or import to make it a valid TypeScript module",
                    path.display()
                ));
                continue;
            }
        }
        let rel_path = tree.rel_path(&path);
        let kind = if RESERVED_ENTRY_POINTS.contains(&crate::paths::strip_extension(&rel_path)) {
            EntryPointKind::Reserved
        } else {
            EntryPointKind::Function
        };
        entry_points.push(EntryPoint {
            path,
            rel_path,
            kind,
        });
    }

    debug!(
        "Classified {} entry points under {:?}",
        entry_points.len(),
        tree.root
    );
    Ok(entry_points)
}

/// Why a file is not an entry point, checked in priority order.
fn exclusion_reason(rel_path: &str, base: &str) -> Option<&'static str> {
    let ext = Path::new(base)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    if !ext.is_some_and(|e| ENTRY_POINT_EXTENSIONS.contains(&e.as_str())) {
        return Some("not a JavaScript or TypeScript file");
    }
    if rel_path.starts_with(&format!("{GENERATED_DIR}/")) {
        return Some("generated code");
    }
    if base.starts_with('.') {
        return Some("dotfile");
    }
    if base.starts_with('#') {
        return Some("likely an editor temp file");
    }
    if base == "schema.ts" || base == "schema.js" {
        return Some("schema is bundled separately");
    }
    if base.matches('.').count() > 1 {
        return Some("contains multiple dots");
    }
    if rel_path.contains(' ') {
        return Some("contains a space");
    }
    None
}

fn is_typescript(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "tsx")
    )
}

pub(crate) fn language_of(path: &Path) -> Option<SourceLanguage> {
    SourceLanguage::from_path(path).ok()
}
