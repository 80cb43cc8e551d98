use super::ProjectArgs;
use crate::project::Project;
use colored::Colorize;
use cvx_bundler::{
    entry_points, resolve_environment, BuildError, BuildOptions, BuildOutput, BuildTool,
    BundleError, EntryPointKind, ModuleEnvironment, ResolveHook,
};
use cvx_logger::Logger;

/// Stands in for the build tool when a command only classifies.
struct NoBuild;

impl BuildTool for NoBuild {
    fn build(
        &self,
        _options: &BuildOptions,
        _hooks: &mut [&mut dyn ResolveHook],
    ) -> Result<BuildOutput, BuildError> {
        Err(BundleError::fatal("entry-points does not run the bundler").into())
    }
}

pub fn handle_entry_points(args: ProjectArgs, logger: &Logger) -> anyhow::Result<()> {
    let project = Project::open(args.dir.as_deref())?;
    let ctx = project.context(logger, &NoBuild);

    let classified = entry_points(&ctx, &project.functions_dir)?;
    if classified.is_empty() {
        logger.warn(&format!(
            "No entry points in {}",
            project.display(&project.functions_dir)
        ));
        return Ok(());
    }

    for entry in &classified {
        let environment = resolve_environment(&ctx, entry)?;
        let kind = match entry.kind {
            EntryPointKind::Function => "function".normal(),
            EntryPointKind::Reserved => "reserved".yellow(),
        };
        let environment = match environment {
            ModuleEnvironment::Isolate => environment.as_str().cyan(),
            ModuleEnvironment::Node => environment.as_str().green(),
        };
        println!("  {:<40} {:<9} {}", entry.rel_path, kind, environment);
    }
    Ok(())
}
