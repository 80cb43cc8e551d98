//! Bundling a set of entry points with the fixed build configuration.

use crate::build_tool::{
    BuildError, BuildFailure, BuildOptions, BuildOutput, Message, OutputFile, Platform,
    ResolveHook,
};
use crate::context::BundleContext;
use crate::environment::ModuleEnvironment;
use crate::errors::BundleError;
use crate::externals::ExternalsHook;
use crate::integrity::check_and_register;
use crate::paths;
use cvx_manifest::{compute_external_packages, external_package_versions, NodeDependency};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CHUNKS_FOLDER: &str = "_deps";
pub const NODE_CHUNKS_FOLDER: &str = "_deps/node";

const NODE_API_NOTE: &str = "Are you trying to bundle for node?";

const USE_NODE_HINT: &str = "\nIt looks like you are using Node APIs from a file without the \"use node\" directive.\n\
Split out actions using Node.js APIs like this into a new file only containing actions that uses \"use node\" \
so these actions will run in a Node.js environment.";

/// One emitted module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Posix path relative to the bundled directory.
    pub path: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
    pub environment: ModuleEnvironment,
}

#[derive(Debug, Clone)]
pub struct BundleRequest<'r> {
    pub dir: &'r Path,
    pub entry_points: Vec<PathBuf>,
    pub platform: Platform,
    pub source_maps: bool,
    pub chunks_folder: &'r str,
    pub external_allow_list: &'r [String],
    pub extra_conditions: &'r [String],
}

impl<'r> BundleRequest<'r> {
    pub fn new(dir: &'r Path, entry_points: Vec<PathBuf>, platform: Platform) -> Self {
        BundleRequest {
            dir,
            entry_points,
            platform,
            source_maps: true,
            chunks_folder: DEFAULT_CHUNKS_FOLDER,
            external_allow_list: &[],
            extra_conditions: &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BundleResult {
    pub modules: Vec<Bundle>,
    /// Exact versions of the external packages the bundle references, with
    /// their externalizable peers.
    pub external_dependencies: Vec<NodeDependency>,
    pub external_module_names: BTreeSet<String>,
    pub bundled_module_names: BTreeSet<String>,
}

/// Bundle `request.entry_points`.
pub fn bundle(ctx: &BundleContext<'_>, request: &BundleRequest<'_>) -> Result<BundleResult, BundleError> {
    if request.entry_points.is_empty() {
        return Ok(BundleResult::default());
    }

    let available = compute_external_packages(ctx.fs, &ctx.package_json, request.external_allow_list)?;
    let mut externals = ExternalsHook::new(&available);

    let mut options = BuildOptions::new(
        request.entry_points.clone(),
        ctx.project_dir.clone(),
        request.dir.to_path_buf(),
        request.platform,
    )
    .with_extra_conditions(request.extra_conditions);
    options.source_maps = request.source_maps;
    options.chunk_names = Some(format!("{}/[hash]", request.chunks_folder));

    let output = {
        let mut hooks: [&mut dyn ResolveHook; 1] = [&mut externals];
        run_build(ctx, &options, &mut hooks, |_| false)?
    };

    let environment = match request.platform {
        Platform::Node => ModuleEnvironment::Node,
        Platform::Browser => ModuleEnvironment::Isolate,
    };
    let modules = collect_modules(&output.output_files, environment);
    debug!(
        "Bundled {} entry points into {} modules for {}",
        request.entry_points.len(),
        modules.len(),
        request.platform.as_str()
    );

    let external_dependencies =
        external_package_versions(ctx.fs, &available, &externals.external_module_names)?;

    Ok(BundleResult {
        modules,
        external_dependencies,
        external_module_names: externals.external_module_names,
        bundled_module_names: externals.bundled_module_names,
    })
}

/// Bundle `schema.ts` (preferred) or `schema.js` from `dir`.
pub fn bundle_schema(
    ctx: &BundleContext<'_>,
    dir: &Path,
    extra_conditions: &[String],
) -> Result<Vec<Bundle>, BundleError> {
    let Some(target) = ["schema.ts", "schema.js"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| ctx.fs.exists(path))
    else {
        return Ok(Vec::new());
    };
    let mut request = BundleRequest::new(dir, vec![target], Platform::Browser);
    request.extra_conditions = extra_conditions;
    Ok(bundle(ctx, &request)?.modules)
}

/// Bundle `auth.config.ts` or `auth.config.js` from `dir`. Both present is an error.
pub fn bundle_auth_config(ctx: &BundleContext<'_>, dir: &Path) -> Result<Vec<Bundle>, BundleError> {
    let js = dir.join("auth.config.js");
    let ts = dir.join("auth.config.ts");
    let (has_js, has_ts) = (ctx.fs.exists(&js), ctx.fs.exists(&ts));
    if has_js && has_ts {
        return Err(BundleError::invalid_at(
            format!("Found both {} and {}, choose one.", js.display(), ts.display()),
            ts,
        ));
    }
    let chosen = match (has_ts, has_js) {
        (true, _) => ts,
        (false, true) => js,
        (false, false) => return Ok(Vec::new()),
    };
    let request = BundleRequest::new(dir, vec![chosen], Platform::Browser);
    Ok(bundle(ctx, &request)?.modules)
}

/// Invoke the build tool and normalize every way it can fail.
///
/// On success the consumed inputs have passed the integrity check and are
/// registered with the change ledger.
pub(crate) fn run_build(
    ctx: &BundleContext<'_>,
    options: &BuildOptions,
    hooks: &mut [&mut dyn ResolveHook],
    exempt: impl Fn(&str) -> bool,
) -> Result<BuildOutput, BundleError> {
    let output = match ctx.tool.build(options, hooks) {
        Ok(output) => output,
        Err(BuildError::Aborted(err)) => return Err(err),
        Err(BuildError::Failed(failure)) => {
            return Err(translate_failure(ctx, options.platform, &failure))
        }
    };

    if !output.errors.is_empty() {
        let message = render_errors(&output.errors);
        let path = output
            .errors
            .iter()
            .find_map(|e| e.location.as_ref())
            .map(|loc| ctx.absolute(&loc.file));
        return Err(BundleError::InvalidFilesystemData { message, path });
    }

    for warning in &output.warnings {
        ctx.log.warning(&format!("esbuild warning: {}", warning.text));
    }

    check_and_register(ctx, &output.metafile, exempt)?;
    Ok(output)
}

fn translate_failure(ctx: &BundleContext<'_>, platform: Platform, failure: &BuildFailure) -> BundleError {
    let mut recommend_use_node = false;
    let mut first_path = None;

    for error in &failure.errors {
        if let Some(location) = &error.location {
            // A later edit to this file should retrigger the build.
            let abs_path = ctx.absolute(&location.file);
            let stat = ctx.fs.stat(&abs_path).ok();
            ctx.fs.register_path(&abs_path, stat);
            first_path.get_or_insert(abs_path);
        }
        if platform != Platform::Node
            && error.notes.iter().any(|note| note.text.contains(NODE_API_NOTE))
        {
            recommend_use_node = true;
        }
    }

    let mut message = render_errors(&failure.errors);
    if recommend_use_node {
        message.push('\n');
        message.push_str(USE_NODE_HINT);
    }
    BundleError::InvalidFilesystemData {
        message,
        path: first_path,
    }
}

fn render_errors(errors: &[Message]) -> String {
    errors
        .iter()
        .map(|error| match &error.location {
            Some(loc) => format!("esbuild error: {}:{}:{}: {}", loc.file, loc.line, loc.column, error.text),
            None => format!("esbuild error: {}", error.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pair each emitted `.js` with its `.map`, if any.
pub(crate) fn collect_modules(files: &[OutputFile], environment: ModuleEnvironment) -> Vec<Bundle> {
    let mut source_maps: BTreeMap<String, &str> = BTreeMap::new();
    let mut sources: Vec<(String, &str)> = Vec::new();
    for file in files {
        let rel = paths::to_posix(&file.path);
        if rel.ends_with(".map") {
            source_maps.insert(rel, &file.text);
        } else {
            sources.push((rel, &file.text));
        }
    }
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    sources
        .into_iter()
        .map(|(path, source)| {
            let source_map = source_maps
                .get(&format!("{path}.map"))
                .map(|text| (*text).to_string());
            Bundle {
                path,
                source: source.to_string(),
                source_map,
                environment,
            }
        })
        .collect()
}
