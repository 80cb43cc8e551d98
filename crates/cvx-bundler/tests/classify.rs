mod common;

use common::{FakeTool, Project};
use cvx_bundler::{
    entry_points, entry_points_by_environment, BundleContext, EntryPointKind, ErrorKind,
};
use cvx_fs::TrackedFs;
use cvx_logger::RecordingSink;

fn rel_paths(project: &Project) -> Vec<(String, EntryPointKind)> {
    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    entry_points(&ctx, &project.path("convex"))
        .unwrap()
        .into_iter()
        .map(|e| (e.rel_path, e.kind))
        .collect()
}

#[test]
fn classification_is_deterministic() {
    let project = Project::new();
    project.write("convex/zeta.ts", "export const z = 1;\n");
    project.write("convex/alpha.ts", "export const a = 1;\n");
    project.write("convex/lib/b.js", "export const b = 1;\n");
    project.write("convex/lib/a.js", "export const a = 1;\n");
    project.write("convex/_generated/api.js", "export const api = {};\n");

    let first = rel_paths(&project);
    let second = rel_paths(&project);
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
        vec!["alpha.ts", "lib/a.js", "lib/b.js", "zeta.ts"]
    );
}

#[test]
fn reserved_modules_and_node_directive() {
    let project = Project::new();
    project.write(
        "convex/schema.ts",
        "import { defineSchema } from \"./lib\";\nexport default defineSchema;\n",
    );
    project.write(
        "convex/http.ts",
        "\"use node\";\nimport { route } from \"./lib\";\nexport default route;\n",
    );
    project.write("convex/foo.ts", "export const foo = 1;\n");

    let classified = rel_paths(&project);
    let functions: Vec<&str> = classified
        .iter()
        .filter(|(_, kind)| *kind == EntryPointKind::Function)
        .map(|(p, _)| p.as_str())
        .collect();
    assert_eq!(functions, vec!["foo.ts"]);
    assert!(!classified.iter().any(|(p, _)| p == "schema.ts"));

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let err = entry_points_by_environment(&ctx, &project.path("convex")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilesystemData);
    assert!(err.to_string().contains("\"use node\" directive is not allowed for http.ts"));
}

#[test]
fn actions_directory_requires_node_directive() {
    let project = Project::new();
    project.write("convex/actions/send.ts", "export const send = 1;\n");

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let err = entry_points_by_environment(&ctx, &project.path("convex")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilesystemData);
    assert!(err.to_string().contains("actions/send.ts is in /actions subfolder"));

    project.write(
        "convex/actions/send.ts",
        "\"use node\";\nexport const send = 1;\n",
    );
    let split = entry_points_by_environment(&ctx, &project.path("convex")).unwrap();
    assert_eq!(split.node.len(), 1);
    assert!(split.isolate.is_empty());
}

#[test]
fn deps_directory_is_reserved() {
    let project = Project::new();
    project.write("convex/_deps/chunk.js", "export const c = 1;\n");

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let err = entry_points(&ctx, &project.path("convex")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilesystemData);
    assert!(err.to_string().contains("reserved for dependencies"));
}

#[test]
fn typescript_without_module_syntax_is_skipped() {
    let project = Project::new();
    project.write("convex/types.ts", "type Foo = string;\n");
    project.write("convex/script.js", "console.log(1);\n");

    let classified = rel_paths(&project);
    assert_eq!(
        classified.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
        vec!["script.js"]
    );
}

#[test]
fn https_router_file_warns_once() {
    let project = Project::new();
    let router = "import { httpRouter } from \"convex/server\";\nexport default httpRouter();\n";
    project.write("convex/https.ts", router);
    project.write("convex/https.js", router);

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    entry_points(&ctx, &project.path("convex")).unwrap();

    let warnings = log.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Did you mean to include http.js?"));
    assert_eq!(log.diagnostics().len(), 1);
}

#[test]
fn non_utf8_source_is_invalid_filesystem_data() {
    let project = Project::new();
    let path = project.path("convex/foo.js");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"// caf\xe9\nexport const foo = 1;\n").unwrap();

    let fs = TrackedFs::new();
    let log = RecordingSink::new();
    let tool = FakeTool::new();
    let ctx = BundleContext::new(&fs, &log, &tool, project.package_json());
    let err = entry_points_by_environment(&ctx, &project.path("convex")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilesystemData);
    assert_eq!(err.path(), Some(&path));
    assert!(err.to_string().contains("not valid UTF-8"));
}
