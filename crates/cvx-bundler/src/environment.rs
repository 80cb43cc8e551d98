use crate::context::BundleContext;
use crate::entry_points::{entry_points, language_of, EntryPoint};
use crate::errors::{read_error, BundleError};
use crate::paths::strip_extension;
use cvx_ast::{scan_use_node, DirectiveTier};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Files that always run in the isolate, whatever their directives say.
pub const ISOLATE_ONLY: [&str; 4] = ["http", "crons", "schema", "auth.config"];

pub const ACTIONS_DIR: &str = "actions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleEnvironment {
    Isolate,
    Node,
}

impl ModuleEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleEnvironment::Isolate => "isolate",
            ModuleEnvironment::Node => "node",
        }
    }
}

/// Whether the module at `rel_path` (posix, relative to the functions dir)
/// is pinned to the isolate environment.
pub fn must_be_isolate(rel_path: &str) -> bool {
    ISOLATE_ONLY.contains(&strip_extension(rel_path))
}

/// Decide where an entry point runs.
pub fn resolve_environment(
    ctx: &BundleContext<'_>,
    entry: &EntryPoint,
) -> Result<ModuleEnvironment, BundleError> {
    let use_node = has_use_node_directive(ctx, &entry.path)?;

    if use_node {
        if must_be_isolate(&entry.rel_path) {
            return Err(BundleError::invalid_at(
                format!("\"use node\" directive is not allowed for {}.", entry.rel_path),
                &entry.path,
            ));
        }
        return Ok(ModuleEnvironment::Node);
    }

    if entry.rel_path.starts_with(&format!("{ACTIONS_DIR}/")) {
        return Err(BundleError::invalid_at(
            format!(
                "{} is in /{ACTIONS_DIR} subfolder but has no \"use node\"; directive. You can now define actions in any folder and indicate they should run in node by adding \"use node\" directive. /{ACTIONS_DIR} is a deprecated way to choose Node.js environment, and we require \"use node\" for all files within that folder to avoid unexpected errors during the migration.",
                entry.rel_path
            ),
            &entry.path,
        ));
    }

    Ok(ModuleEnvironment::Isolate)
}

fn has_use_node_directive(ctx: &BundleContext<'_>, path: &Path) -> Result<bool, BundleError> {
    let Some(language) = language_of(path) else {
        return Ok(false);
    };
    let source = ctx.fs.read_utf8(path).map_err(read_error)?;
    let scan = scan_use_node(&source, language);
    if scan.tier == DirectiveTier::RegexFallback {
        ctx.log.verbose(&format!(
            "Failed to parse {} while looking for \"use node\" ({}), matched lines instead",
            path.display(),
            scan.parse_error.as_deref().unwrap_or("unknown error")
        ));
    }
    Ok(scan.found)
}

/// Entry points of `dir` split by environment, each list in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPointsByEnvironment {
    pub isolate: Vec<EntryPoint>,
    pub node: Vec<EntryPoint>,
}

pub fn entry_points_by_environment(
    ctx: &BundleContext<'_>,
    dir: &Path,
) -> Result<EntryPointsByEnvironment, BundleError> {
    let mut split = EntryPointsByEnvironment::default();
    for entry in entry_points(ctx, dir)? {
        match resolve_environment(ctx, &entry)? {
            ModuleEnvironment::Isolate => split.isolate.push(entry),
            ModuleEnvironment::Node => split.node.push(entry),
        }
    }
    Ok(split)
}
