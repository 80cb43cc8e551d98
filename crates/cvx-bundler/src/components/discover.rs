use super::directory::{component_for_definition, is_definition_file, ComponentDirectory};
use super::plugin::{ComponentHook, ComponentHookMode};
use crate::build_tool::{BuildOptions, Metafile, Platform, ResolveHook};
use crate::bundle::run_build;
use crate::context::BundleContext;
use crate::errors::BundleError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

/// Component directories reachable from the root and the direct imports
/// between their definition files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentGraph {
    pub root: ComponentDirectory,
    /// Every component including the root, ordered by directory path.
    pub components: Vec<ComponentDirectory>,
    /// `(importer, imported)` pairs, ordered.
    pub edges: Vec<(ComponentDirectory, ComponentDirectory)>,
}

impl ComponentGraph {
    /// Directories `importer` depends on directly.
    pub fn dependencies_of<'g>(
        &'g self,
        importer: &'g ComponentDirectory,
    ) -> impl Iterator<Item = &'g ComponentDirectory> + 'g {
        self.edges
            .iter()
            .filter(move |(from, _)| from.path == importer.path)
            .map(|(_, to)| to)
    }
}

/// Build from the root definition, following component imports, and read
/// the graph off the resulting metafile.
///
/// Only direct imports between definition files become edges; a definition
/// that reaches another through an ordinary module does not.
pub fn component_graph(
    ctx: &BundleContext<'_>,
    root: &ComponentDirectory,
    extra_conditions: &[String],
) -> Result<ComponentGraph, BundleError> {
    let mut hook = ComponentHook::new(ComponentHookMode::Discover, ctx.fs, ctx.log, root.clone())?;

    let mut options = BuildOptions::new(
        vec![root.definition_path.clone()],
        ctx.project_dir.clone(),
        root.path.clone(),
        Platform::Browser,
    )
    .with_extra_conditions(extra_conditions);
    options.source_maps = false;
    options.splitting = false;

    let output = {
        let mut hooks: [&mut dyn ResolveHook; 1] = [&mut hook];
        run_build(ctx, &options, &mut hooks, is_definition_file)?
    };

    let graph = graph_from_metafile(ctx, root, &output.metafile)?;
    debug!(
        "Discovered {} components and {} edges",
        graph.components.len(),
        graph.edges.len()
    );
    Ok(graph)
}

fn graph_from_metafile(
    ctx: &BundleContext<'_>,
    root: &ComponentDirectory,
    metafile: &Metafile,
) -> Result<ComponentGraph, BundleError> {
    let mut by_definition: BTreeMap<PathBuf, ComponentDirectory> = BTreeMap::new();
    for input in metafile.inputs.keys().filter(|p| is_definition_file(p)) {
        let definition = ctx.absolute(input);
        let component = component_for_definition(ctx.fs, &definition, &root.path)?;
        by_definition.insert(definition, component);
    }

    let mut edges: BTreeSet<(ComponentDirectory, ComponentDirectory)> = BTreeSet::new();
    for (input_path, input) in metafile.inputs.iter().filter(|(p, _)| is_definition_file(p)) {
        let Some(importer) = by_definition.get(&ctx.absolute(input_path)) else {
            return Err(BundleError::fatal(format!("{input_path} vanished from the component map")));
        };
        for import in input
            .imports
            .iter()
            .filter(|i| !i.external && is_definition_file(&i.path))
        {
            let target = ctx.absolute(&import.path);
            let Some(imported) = by_definition.get(&target) else {
                return Err(BundleError::fatal(format!(
                    "Didn't find {} in {}",
                    target.display(),
                    by_definition
                        .keys()
                        .map(|k| k.display().to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )));
            };
            edges.insert((importer.clone(), imported.clone()));
        }
    }

    let mut components: Vec<ComponentDirectory> = by_definition.into_values().collect();
    components.sort_by(|a, b| a.path.cmp(&b.path));
    components.dedup_by(|a, b| a.path == b.path);

    let mut edges: Vec<_> = edges.into_iter().collect();
    edges.sort_by(|(a1, b1), (a2, b2)| (&a1.path, &b1.path).cmp(&(&a2.path, &b2.path)));

    let root = components
        .iter()
        .find(|c| c.path == root.path)
        .cloned()
        .unwrap_or_else(|| root.clone());

    Ok(ComponentGraph {
        root,
        components,
        edges,
    })
}
