//! A whole bundling run over one project.

use crate::assembler::{assemble, assemble_app, StartPushPayload};
use crate::components::{
    bundle_app, bundle_definitions, bundle_implementations, component_graph,
    is_component_directory, ImplementationOptions,
};
use crate::context::BundleContext;
use crate::errors::BundleError;
use cvx_config::ProjectConfig;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ProjectRequest<'r> {
    pub functions_dir: &'r Path,
    pub project_config: &'r ProjectConfig,
    pub source_maps: bool,
    pub extra_conditions: &'r [String],
}

/// Bundle the project rooted at `request.functions_dir` into a payload.
///
/// A functions directory holding a `convex.config` is bundled as a component
/// graph; otherwise it is bundled as a plain app.
pub fn bundle_project(
    ctx: &BundleContext<'_>,
    request: &ProjectRequest<'_>,
) -> Result<StartPushPayload, BundleError> {
    if !ctx.fs.exists(request.functions_dir) {
        return Err(BundleError::invalid_at(
            format!(
                "Functions directory {} does not exist",
                request.functions_dir.display()
            ),
            request.functions_dir,
        ));
    }

    let options = ImplementationOptions {
        source_maps: request.source_maps,
        external_allow_list: request.project_config.external_packages(),
        extra_conditions: request.extra_conditions,
    };
    let node_version = request.project_config.node.node_version.clone();

    let root = match is_component_directory(ctx.fs, request.functions_dir, true) {
        Ok(root) => root,
        Err(why) => {
            debug!("{} is not a component ({why}), bundling as an app", request.functions_dir.display());
            let app = bundle_app(ctx, request.functions_dir, options)?;
            return Ok(assemble_app(app, node_version));
        }
    };

    let graph = component_graph(ctx, &root, request.extra_conditions)?;
    info!("Found {} components", graph.components.len());
    let definitions = bundle_definitions(ctx, &graph, request.extra_conditions)?;
    let implementations = bundle_implementations(ctx, &graph, options)?;
    assemble(definitions, implementations, node_version)
}
