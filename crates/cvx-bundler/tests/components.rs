mod common;

use common::{FakeTool, Project};
use cvx_bundler::components::{
    bundle_definitions, component_graph, decode_definition_import, is_component_directory,
};
use cvx_bundler::{
    bundle_project, BuildError, BuildOptions, BuildOutput, BuildTool, BundleContext, ErrorKind,
    MetafileImport, ProjectRequest, ResolveHook, ResolveKind,
};
use cvx_config::ProjectConfig;
use cvx_fs::TrackedFs;
use cvx_logger::RecordingSink;

/// `convex/` is the app; it uses the component in `shared/`.
fn component_project() -> Project {
    let project = Project::new();
    project.write(
        "convex/convex.config.ts",
        "import shared from \"../shared/convex.config\";\nexport default { use: [shared] };\n",
    );
    project.write("convex/messages.ts", "export const list = 1;\n");
    project.write("convex/schema.ts", "export default { tables: [] };\n");
    project.write("shared/convex.config.ts", "export default { name: \"shared\" };\n");
    project.write(
        "shared/counter.ts",
        "import { step } from \"./lib\";\nexport const increment = step;\n",
    );
    project.write("shared/lib.ts", "export const step = 1;\n");
    project
}

#[test]
fn discovers_graph_and_rewrites_component_imports() {
    let project = component_project();
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());

    let root = is_component_directory(&fs, &project.path("convex"), true).unwrap();
    let graph = component_graph(&ctx, &root, &[]).unwrap();
    assert_eq!(graph.components.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    let (from, to) = &graph.edges[0];
    assert_eq!(from.path, project.path("convex"));
    assert_eq!(to.path, project.path("shared"));

    let definitions = bundle_definitions(&ctx, &graph, &[]).unwrap();
    assert_eq!(definitions.components.len(), 1);
    assert!(definitions.app.definition_path.is_root());
    assert_eq!(definitions.app.definition.path, "convex.config.js");
    assert_eq!(definitions.app.dependencies[0].as_str(), "../shared");
    assert_eq!(definitions.components[0].definition_path.as_str(), "../shared");

    let source = &definitions.app.definition.source;
    assert!(source.contains("import \"./_componentDeps/Li4vc2hhcmVk\""));
    assert!(!source.contains("name: \"shared\""));
    let decoded = decode_definition_import("./_componentDeps/Li4vc2hhcmVk").unwrap();
    assert_eq!(decoded.as_str(), "../shared");

    let discover = &tool.builds.borrow()[0];
    assert!(!discover.splitting && !discover.source_maps);
}

#[test]
fn component_project_assembles_one_payload() {
    let project = component_project();
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let config = ProjectConfig::default();
    let functions_dir = project.path("convex");

    let payload = bundle_project(
        &ctx,
        &ProjectRequest {
            functions_dir: &functions_dir,
            project_config: &config,
            source_maps: true,
            extra_conditions: &[],
        },
    )
    .unwrap();

    let app = &payload.app_definition;
    assert!(app.definition.is_some());
    assert_eq!(app.schema.as_ref().map(|s| s.path.as_str()), Some("schema.js"));
    assert_eq!(
        app.functions.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
        vec!["messages.js"]
    );
    assert_eq!(payload.component_definitions.len(), 1);
    let shared = &payload.component_definitions[0];
    assert_eq!(shared.definition_path.as_str(), "../shared");
    assert_eq!(
        shared.functions.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
        vec!["counter.js", "lib.js"]
    );
    assert!(payload.node_dependencies.is_empty());
}

#[test]
fn component_external_dependencies_are_fatal() {
    let project = component_project();
    project.write(
        "package.json",
        r#"{"name": "app", "dependencies": {"sharp": "0.33.2", "left-pad": "1.3.0"}}"#,
    );
    project.install("sharp", "0.33.2", "");
    project.install("left-pad", "1.3.0", "");
    project.write(
        "convex/images.ts",
        "\"use node\";\nimport sharp from \"sharp\";\nexport const resize = sharp;\n",
    );
    project.write(
        "shared/pad.ts",
        "\"use node\";\nimport pad from \"left-pad\";\nexport const p = pad;\n",
    );

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let config: ProjectConfig = serde_json::from_str(
        r#"{"node": {"externalPackages": ["sharp", "left-pad"]}}"#,
    )
    .unwrap();
    let functions_dir = project.path("convex");

    let err = bundle_project(
        &ctx,
        &ProjectRequest {
            functions_dir: &functions_dir,
            project_config: &config,
            source_maps: true,
            extra_conditions: &[],
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(err.to_string().contains("external dependencies not supported"));
}

#[test]
fn node_directive_in_component_is_rejected() {
    let project = component_project();
    project.write("shared/node_only.ts", "\"use node\";\nexport const n = 1;\n");

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let config = ProjectConfig::default();
    let functions_dir = project.path("convex");

    let err = bundle_project(
        &ctx,
        &ProjectRequest {
            functions_dir: &functions_dir,
            project_config: &config,
            source_maps: false,
            extra_conditions: &[],
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilesystemData);
    assert!(err
        .to_string()
        .contains("\"use node\" directive is not supported in components"));
}

#[test]
fn plain_app_has_no_definition() {
    let project = Project::new();
    project.write("convex/messages.ts", "export const list = 1;\n");
    project.write("convex/auth.config.ts", "export default { providers: [] };\n");

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let config = ProjectConfig::default();
    let functions_dir = project.path("convex");

    let payload = bundle_project(
        &ctx,
        &ProjectRequest {
            functions_dir: &functions_dir,
            project_config: &config,
            source_maps: true,
            extra_conditions: &[],
        },
    )
    .unwrap();
    assert!(payload.app_definition.definition.is_none());
    assert!(payload.component_definitions.is_empty());
    assert_eq!(
        payload.app_definition.auth.as_ref().map(|a| a.path.as_str()),
        Some("auth.config.js")
    );
}

#[test]
fn both_auth_configs_are_rejected() {
    let project = Project::new();
    project.write("convex/messages.ts", "export const list = 1;\n");
    project.write("convex/auth.config.ts", "export default {};\n");
    project.write("convex/auth.config.js", "export default {};\n");

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let config = ProjectConfig::default();
    let functions_dir = project.path("convex");

    let err = bundle_project(
        &ctx,
        &ProjectRequest {
            functions_dir: &functions_dir,
            project_config: &config,
            source_maps: true,
            extra_conditions: &[],
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilesystemData);
    assert!(err.to_string().contains("choose one"));
}

/// Reports an extra import from the app definition to a definition that
/// never took part in the build.
struct StrayEdgeTool(FakeTool);

impl BuildTool for StrayEdgeTool {
    fn build(
        &self,
        options: &BuildOptions,
        hooks: &mut [&mut dyn ResolveHook],
    ) -> Result<BuildOutput, BuildError> {
        let mut output = self.0.build(options, hooks)?;
        if let Some(input) = output.metafile.inputs.get_mut("convex/convex.config.ts") {
            input.imports.push(MetafileImport {
                path: "ghost/convex.config.ts".to_string(),
                kind: ResolveKind::ImportStatement,
                external: false,
                original: Some("../ghost/convex.config".to_string()),
            });
        }
        Ok(output)
    }
}

#[test]
fn definition_size_drift_is_not_transient() {
    let project = component_project();
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new().with_skew("shared/convex.config.ts");
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let config = ProjectConfig::default();
    let functions_dir = project.path("convex");

    let payload = bundle_project(
        &ctx,
        &ProjectRequest {
            functions_dir: &functions_dir,
            project_config: &config,
            source_maps: false,
            extra_conditions: &[],
        },
    )
    .unwrap();
    assert_eq!(payload.component_definitions.len(), 1);
    assert!(!log
        .warnings()
        .iter()
        .any(|w| w.contains("changed right after the build")));
}

#[test]
fn graph_without_its_root_has_no_app_bundle() {
    let project = component_project();
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());

    let root = is_component_directory(&fs, &project.path("convex"), true).unwrap();
    let mut graph = component_graph(&ctx, &root, &[]).unwrap();
    graph.components.retain(|c| c.path != root.path);
    graph.edges.clear();

    let err = bundle_definitions(&ctx, &graph, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(err.to_string().contains("Found wrong number of app bundles: 0"));
}

#[test]
fn edge_to_unbuilt_definition_is_fatal() {
    let project = component_project();
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = StrayEdgeTool(FakeTool::new());
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());

    let root = is_component_directory(&fs, &project.path("convex"), true).unwrap();
    let err = component_graph(&ctx, &root, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(err.to_string().contains("Didn't find"));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn repeated_definition_entry_point_is_fatal() {
    let project = component_project();
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());

    let root = is_component_directory(&fs, &project.path("convex"), true).unwrap();
    let mut graph = component_graph(&ctx, &root, &[]).unwrap();
    graph.components.push(graph.root.clone());

    let err = bundle_definitions(&ctx, &graph, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(err.to_string().contains("already registered"));
}
