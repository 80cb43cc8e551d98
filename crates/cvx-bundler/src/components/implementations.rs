use super::definition_path::{to_definition_path, ComponentDefinitionPath};
use super::discover::ComponentGraph;
use crate::build_tool::Platform;
use crate::bundle::{
    bundle, bundle_auth_config, bundle_schema, Bundle, BundleRequest, BundleResult,
    NODE_CHUNKS_FOLDER,
};
use crate::context::BundleContext;
use crate::entry_points::EntryPoint;
use crate::environment::entry_points_by_environment;
use crate::errors::BundleError;
use cvx_manifest::NodeDependency;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppImplementation {
    pub schema: Option<Bundle>,
    pub functions: Vec<Bundle>,
    pub external_node_dependencies: Vec<NodeDependency>,
    pub auth: Option<Bundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentImplementation {
    pub definition_path: ComponentDefinitionPath,
    pub schema: Option<Bundle>,
    pub functions: Vec<Bundle>,
    pub external_node_dependencies: Vec<NodeDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implementations {
    pub app: AppImplementation,
    pub components: Vec<ComponentImplementation>,
}

/// Options shared by every per-component bundle.
#[derive(Debug, Clone, Copy)]
pub struct ImplementationOptions<'r> {
    pub source_maps: bool,
    pub external_allow_list: &'r [String],
    pub extra_conditions: &'r [String],
}

/// Bundle schema, functions and (for the root only) auth config of every
/// component in `graph`, one directory at a time.
pub fn bundle_implementations(
    ctx: &BundleContext<'_>,
    graph: &ComponentGraph,
    options: ImplementationOptions<'_>,
) -> Result<Implementations, BundleError> {
    let mut app = None;
    let mut components = Vec::new();

    for directory in &graph.components {
        if directory.path == graph.root.path {
            app = Some(bundle_app(ctx, &directory.path, options)?);
            continue;
        }

        debug!("Bundling implementation of {}", directory.path.display());
        let schema = bundle_schema(ctx, &directory.path, options.extra_conditions)?
            .into_iter()
            .next();
        let split = entry_points_by_environment(ctx, &directory.path)?;
        let mut functions = bundle_isolate(ctx, &directory.path, &split.isolate, options)?;
        let node = bundle_node(ctx, &directory.path, &split.node, options)?;
        functions.extend(node.modules.iter().cloned());

        if !node.modules.is_empty() && node.external_dependencies.is_empty() {
            return Err(BundleError::invalid_at(
                format!(
                    "\"use node\" directive is not supported in components. Remove it from the component at: {}.",
                    directory.path.display()
                ),
                &directory.path,
            ));
        }
        components.push(ComponentImplementation {
            definition_path: to_definition_path(&graph.root, directory),
            schema,
            functions,
            external_node_dependencies: node.external_dependencies,
        });
    }

    let app = app.ok_or_else(|| {
        BundleError::fatal(format!(
            "No implementation bundled for the app at {}",
            graph.root.path.display()
        ))
    })?;
    Ok(Implementations { app, components })
}

/// Bundle the app rooted at `dir`: schema, isolate and node functions, and
/// auth config. Only the app may keep packages external.
pub fn bundle_app(
    ctx: &BundleContext<'_>,
    dir: &Path,
    options: ImplementationOptions<'_>,
) -> Result<AppImplementation, BundleError> {
    debug!("Bundling app in {}", dir.display());
    let schema = bundle_schema(ctx, dir, options.extra_conditions)?.into_iter().next();
    let split = entry_points_by_environment(ctx, dir)?;
    let mut functions = bundle_isolate(ctx, dir, &split.isolate, options)?;
    let node = bundle_node(ctx, dir, &split.node, options)?;
    functions.extend(node.modules);
    let auth = bundle_auth_config(ctx, dir)?.into_iter().next();
    Ok(AppImplementation {
        schema,
        functions,
        external_node_dependencies: node.external_dependencies,
        auth,
    })
}

fn bundle_isolate(
    ctx: &BundleContext<'_>,
    dir: &Path,
    entry_points: &[EntryPoint],
    options: ImplementationOptions<'_>,
) -> Result<Vec<Bundle>, BundleError> {
    let mut request = BundleRequest::new(
        dir,
        entry_points.iter().map(|e| e.path.clone()).collect(),
        Platform::Browser,
    );
    request.source_maps = options.source_maps;
    request.extra_conditions = options.extra_conditions;
    Ok(bundle(ctx, &request)?.modules)
}

fn bundle_node(
    ctx: &BundleContext<'_>,
    dir: &Path,
    entry_points: &[EntryPoint],
    options: ImplementationOptions<'_>,
) -> Result<BundleResult, BundleError> {
    let mut request = BundleRequest::new(
        dir,
        entry_points.iter().map(|e| e.path.clone()).collect(),
        Platform::Node,
    );
    request.source_maps = options.source_maps;
    request.chunks_folder = NODE_CHUNKS_FOLDER;
    request.external_allow_list = options.external_allow_list;
    request.extra_conditions = options.extra_conditions;
    bundle(ctx, &request)
}
