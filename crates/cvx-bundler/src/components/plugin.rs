use super::definition_path::{encode_definition_import, to_definition_path};
use super::directory::{component_for_definition, is_component_directory, ComponentDirectory};
use crate::build_tool::{HookPlan, ResolveArgs, ResolveHook, ResolveKind, ResolveOutcome};
use crate::errors::BundleError;
use crate::paths;
use cvx_fs::Filesystem;
use cvx_logger::LogSink;
use cvx_manifest::NodeModulesLocator;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHookMode {
    /// Follow imports of other components so the build walks the whole graph.
    Discover,
    /// Replace imports of other components with encoded references.
    Bundle,
}

/// Intercepts imports of component definition files.
pub struct ComponentHook<'a> {
    mode: ComponentHookMode,
    fs: &'a dyn Filesystem,
    log: &'a dyn LogSink,
    root: ComponentDirectory,
    filter: Regex,
    /// Keyed by definition file path.
    components: BTreeMap<PathBuf, ComponentDirectory>,
}

impl<'a> ComponentHook<'a> {
    pub fn new(
        mode: ComponentHookMode,
        fs: &'a dyn Filesystem,
        log: &'a dyn LogSink,
        root: ComponentDirectory,
    ) -> Result<Self, BundleError> {
        let filter = Regex::new(r".*convex\.config.*")
            .map_err(|e| BundleError::fatal(format!("Invalid component filter: {e}")))?;
        Ok(ComponentHook {
            mode,
            fs,
            log,
            root,
            filter,
            components: BTreeMap::new(),
        })
    }

    /// Components seen so far, ordered by definition path.
    pub fn components(&self) -> impl Iterator<Item = &ComponentDirectory> {
        self.components.values()
    }

    fn register_entry_point(&mut self, args: &ResolveArgs) -> Result<ResolveOutcome, BundleError> {
        self.log.verbose("  -> Top-level entry-point.");
        let definition = paths::normalize(&args.resolve_dir.join(&args.path));
        if self.components.contains_key(&definition) {
            return Err(BundleError::fatal(format!(
                "Entry point component {} already registered.",
                args.path
            )));
        }
        let component = component_for_definition(self.fs, &definition, &self.root.path)?;
        self.components.insert(definition, component);
        Ok(ResolveOutcome::None)
    }

    fn resolve_candidate(&self, resolve_dir: &Path, candidate: &str) -> Option<PathBuf> {
        let is_path = candidate.starts_with("./")
            || candidate.starts_with("../")
            || Path::new(candidate).is_absolute();
        let resolved = if is_path {
            Some(paths::normalize(&resolve_dir.join(candidate)))
        } else {
            NodeModulesLocator::resolve_bare(self.fs, resolve_dir, candidate).map(|p| paths::normalize(&p))
        }?;
        let is_file = self.fs.stat(&resolved).map(|s| s.is_file()).unwrap_or(false);
        is_file.then_some(resolved)
    }
}

/// Paths tried, in order, for an import of a definition file.
pub(crate) fn resolution_candidates(specifier: &str) -> Vec<String> {
    let mut candidates = vec![specifier.to_string()];
    let ext = Path::new(specifier).extension().and_then(|e| e.to_str());
    match ext {
        Some("js") => {
            candidates.push(format!("{}.ts", &specifier[..specifier.len() - ".js".len()]));
        }
        Some("ts") => {}
        _ => {
            candidates.push(format!("{specifier}.js"));
            candidates.push(format!("{specifier}.ts"));
        }
    }
    candidates
}

impl ResolveHook for ComponentHook<'_> {
    fn name(&self) -> &str {
        match self.mode {
            ComponentHookMode::Discover => "convex-discover-components",
            ComponentHookMode::Bundle => "convex-bundle-components",
        }
    }

    fn filter(&self) -> Option<&Regex> {
        Some(&self.filter)
    }

    fn plan(&self) -> HookPlan {
        HookPlan::Dynamic
    }

    fn on_resolve(&mut self, args: &ResolveArgs) -> Result<ResolveOutcome, BundleError> {
        self.log
            .verbose(&format!("Resolving import of {} from {}", args.path, args.importer));
        if args.namespace != "file" {
            self.log.verbose("  Not a file.");
            return Ok(ResolveOutcome::None);
        }
        if args.kind == ResolveKind::EntryPoint {
            return self.register_entry_point(args);
        }

        let Some(resolved) = resolution_candidates(&args.path)
            .iter()
            .find_map(|candidate| self.resolve_candidate(&args.resolve_dir, candidate))
        else {
            self.log.verbose(&format!("  -> {} not found.", args.path));
            return Ok(ResolveOutcome::None);
        };

        let imported = match self.components.get(&resolved) {
            Some(existing) => existing.clone(),
            None => {
                let parent = resolved.parent().unwrap_or_else(|| Path::new("/"));
                match is_component_directory(self.fs, parent, false) {
                    Ok(component) => {
                        self.components.insert(resolved.clone(), component.clone());
                        component
                    }
                    Err(why) => {
                        self.log.verbose(&format!("  -> Not a component: {why}"));
                        return Ok(ResolveOutcome::None);
                    }
                }
            }
        };

        self.log.verbose(&format!(
            "  -> Component import! Recording it. {} {}",
            args.path,
            resolved.display()
        ));
        match self.mode {
            ComponentHookMode::Discover => Ok(ResolveOutcome::Path(resolved)),
            ComponentHookMode::Bundle => Ok(ResolveOutcome::External(encode_definition_import(
                &to_definition_path(&self.root, &imported),
            ))),
        }
    }
}
