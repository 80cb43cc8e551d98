use super::definition_path::{to_definition_path, ComponentDefinitionPath};
use super::directory::{is_definition_file, ComponentDirectory};
use super::discover::ComponentGraph;
use super::plugin::{ComponentHook, ComponentHookMode};
use crate::build_tool::{BuildOptions, OutputFile, Platform, ResolveHook};
use crate::bundle::{run_build, Bundle};
use crate::context::BundleContext;
use crate::environment::ModuleEnvironment;
use crate::errors::BundleError;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A bundled definition file, not yet paired with its implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    pub definition_path: ComponentDefinitionPath,
    pub definition: Bundle,
    pub dependencies: Vec<ComponentDefinitionPath>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionBundles {
    pub app: DefinitionSpec,
    pub components: Vec<DefinitionSpec>,
}

/// Bundle every definition in `graph` in one build.
///
/// Imports of other components are left as encoded references, so each
/// output holds exactly one component's definition code.
pub fn bundle_definitions(
    ctx: &BundleContext<'_>,
    graph: &ComponentGraph,
    extra_conditions: &[String],
) -> Result<DefinitionBundles, BundleError> {
    let outbase = paths::common_ancestor(graph.components.iter().map(|c| c.path.as_path()))
        .ok_or_else(|| BundleError::fatal("Component directories share no common ancestor"))?;

    let mut hook = ComponentHook::new(ComponentHookMode::Bundle, ctx.fs, ctx.log, graph.root.clone())?;
    let mut options = BuildOptions::new(
        graph
            .components
            .iter()
            .map(|c| c.definition_path.clone())
            .collect(),
        ctx.project_dir.clone(),
        outbase.clone(),
        Platform::Browser,
    )
    .with_extra_conditions(extra_conditions);
    options.splitting = false;

    let output = {
        let mut hooks: [&mut dyn ResolveHook; 1] = [&mut hook];
        run_build(ctx, &options, &mut hooks, is_definition_file)?
    };

    let mut app = Vec::new();
    let mut components = Vec::new();
    for directory in &graph.components {
        let expected = expected_output(&outbase, &directory.definition_path);
        let definition = find_output(&output.output_files, &expected, directory)?;
        let dependencies = graph
            .dependencies_of(directory)
            .map(|imported| to_definition_path(&graph.root, imported))
            .collect();
        let spec = DefinitionSpec {
            definition_path: to_definition_path(&graph.root, directory),
            definition,
            dependencies,
        };
        if directory.path == graph.root.path {
            app.push(spec);
        } else {
            components.push(spec);
        }
    }

    if app.len() != 1 {
        return Err(BundleError::fatal(format!(
            "Found wrong number of app bundles: {}",
            app.len()
        )));
    }
    let app = app.remove(0);

    Ok(DefinitionBundles { app, components })
}

/// Output path (relative to the output dir) the tool emits for `input`.
fn expected_output(outbase: &Path, input: &Path) -> PathBuf {
    let rel = paths::to_posix(&paths::relative(outbase, input));
    PathBuf::from(format!("{}.js", paths::strip_extension(&rel)))
}

fn find_output(
    files: &[OutputFile],
    expected_js: &Path,
    directory: &ComponentDirectory,
) -> Result<Bundle, BundleError> {
    let expected_map = PathBuf::from(format!("{}.map", expected_js.display()));
    let matches: Vec<&OutputFile> = files
        .iter()
        .filter(|f| paths::normalize(&f.path) == *expected_js)
        .collect();
    if matches.len() != 1 {
        return Err(BundleError::fatal(format!(
            "Didn't expect {} outputs for {}",
            matches.len(),
            directory.path.display()
        )));
    }
    let source_map = files
        .iter()
        .find(|f| paths::normalize(&f.path) == expected_map)
        .map(|f| f.text.clone());
    let file_name = expected_js
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Bundle {
        path: file_name,
        source: matches[0].text.clone(),
        source_map,
        environment: ModuleEnvironment::Isolate,
    })
}
