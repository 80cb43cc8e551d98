use crate::project::Project;
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use cvx_bundler::{bundle_project, Bundle, ProjectRequest, StartPushPayload};
use cvx_logger::Logger;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct BundleCommand {
    /// Functions directory (defaults to `functions` in convex.json, else ./convex)
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Write the assembled payload as JSON to this file
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Skip source maps even if the user config enables them
    #[arg(long)]
    pub no_source_maps: bool,
}

pub fn handle_bundle(cmd: BundleCommand, logger: &Logger) -> anyhow::Result<()> {
    let project = Project::open(cmd.dir.as_deref())?;
    let tool = project.esbuild()?;
    logger.debug(&format!("Using esbuild at {}", tool.exe().display()));

    let extra_conditions = project.user_config.extra_conditions();
    let request = ProjectRequest {
        functions_dir: &project.functions_dir,
        project_config: &project.project_config,
        source_maps: !cmd.no_source_maps && project.user_config.source_maps_enabled(),
        extra_conditions: &extra_conditions,
    };
    let ctx = project.context(logger, &tool);

    logger.spinner_start(&format!(
        "Bundling {}",
        project.display(&project.functions_dir)
    ));
    let payload = match bundle_project(&ctx, &request) {
        Ok(payload) => payload,
        Err(e) => {
            logger.spinner_stop();
            return Err(e.into());
        }
    };
    logger.spinner_success(&format!(
        "Bundled {} modules across {} component(s)",
        payload.modules().count(),
        payload.component_definitions.len() + 1
    ));

    if logger.verbosity() >= 1 {
        for line in size_report(&payload) {
            println!("{line}");
        }
    }
    for dependency in &payload.node_dependencies {
        logger.info(&format!(
            "External: {}@{}",
            dependency.name, dependency.version
        ));
    }

    if let Some(out) = cmd.out {
        let json = serde_json::to_string_pretty(&payload)?;
        fs::write(&out, json).with_context(|| format!("Failed to write {}", out.display()))?;
        logger.success(&format!("Wrote payload to {}", out.display()));
    }
    Ok(())
}

/// One line per emitted module, grouped by component.
pub fn size_report(payload: &StartPushPayload) -> Vec<String> {
    let app = &payload.app_definition;
    let mut lines = Vec::new();
    push_section(
        &mut lines,
        "app",
        app.definition
            .iter()
            .chain(app.schema.iter())
            .chain(app.functions.iter())
            .chain(app.auth.iter()),
    );
    for component in &payload.component_definitions {
        push_section(
            &mut lines,
            component.definition_path.as_str(),
            std::iter::once(&component.definition)
                .chain(component.schema.iter())
                .chain(component.functions.iter()),
        );
    }
    lines
}

fn push_section<'b>(lines: &mut Vec<String>, title: &str, modules: impl Iterator<Item = &'b Bundle>) {
    lines.push(title.bold().to_string());
    for module in modules {
        let map = module
            .source_map
            .as_ref()
            .map(|m| format!(" (+{} map)", format_size(m.len())))
            .unwrap_or_default();
        lines.push(format!(
            "  {:<40} {:<8} {}{}",
            module.path,
            module.environment.as_str(),
            format_size(module.source.len()),
            map
        ));
    }
}

pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    }
}
