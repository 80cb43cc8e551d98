use super::ProjectArgs;
use crate::project::Project;
use colored::Colorize;
use cvx_bundler::components::{component_graph, is_component_directory};
use cvx_logger::Logger;

pub fn handle_components(args: ProjectArgs, logger: &Logger) -> anyhow::Result<()> {
    let project = Project::open(args.dir.as_deref())?;
    let root = match is_component_directory(&project.fs, &project.functions_dir, true) {
        Ok(root) => root,
        Err(why) => {
            logger.info(&format!(
                "{}: {why}",
                project.display(&project.functions_dir)
            ));
            println!("No component definition, bundled as a plain app.");
            return Ok(());
        }
    };

    let tool = project.esbuild()?;
    let ctx = project.context(logger, &tool);
    let extra_conditions = project.user_config.extra_conditions();
    logger.spinner_start("Discovering components");
    let graph = match component_graph(&ctx, &root, &extra_conditions) {
        Ok(graph) => graph,
        Err(e) => {
            logger.spinner_stop();
            return Err(e.into());
        }
    };
    logger.spinner_stop();

    println!("{}", "Components:".bold().green());
    for component in &graph.components {
        let marker = if component.is_root { " (root)" } else { "" };
        println!("  {}{}", project.display(&component.path).cyan(), marker);
    }
    if !graph.edges.is_empty() {
        println!("{}", "Uses:".bold().green());
        for (from, to) in &graph.edges {
            println!(
                "  {} -> {}",
                project.display(&from.path),
                project.display(&to.path)
            );
        }
    }
    Ok(())
}
