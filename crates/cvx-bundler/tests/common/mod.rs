//! Shared fixtures: an on-disk project builder and an in-process build tool.
#![allow(dead_code)]

use cvx_bundler::paths;
use cvx_bundler::{
    BuildError, BuildFailure, BuildOptions, BuildOutput, BuildTool, Location, Message, Metafile,
    MetafileImport, MetafileInput, Note, OutputFile, Platform, ResolveArgs, ResolveHook,
    ResolveKind, ResolveOutcome,
};
use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const NODE_BUILTINS: [&str; 6] = ["fs", "path", "crypto", "os", "child_process", "stream"];

/// A throwaway project with a `package.json` at its root.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let project = Project {
            dir: TempDir::new().unwrap(),
        };
        project.write("package.json", r#"{"name": "app", "version": "0.0.0"}"#);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn package_json(&self) -> PathBuf {
        self.path("package.json")
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Install `name` under `node_modules` with an `index.js`.
    pub fn install(&self, name: &str, version: &str, extra_manifest: &str) {
        let manifest = format!(r#"{{"name": "{name}", "version": "{version}"{extra_manifest}}}"#);
        self.write(&format!("node_modules/{name}/package.json"), &manifest);
        self.write(
            &format!("node_modules/{name}/index.js"),
            &format!("export default \"{name}\";\n"),
        );
    }
}

/// Resolves imports the way a bundler would, consulting hooks first, and
/// "emits" each entry point as the concatenation of the modules it reached.
#[derive(Default)]
pub struct FakeTool {
    /// Metafile inputs whose key ends with this report one byte too many.
    skew: Option<String>,
    pub builds: RefCell<Vec<BuildOptions>>,
}

struct Walk<'h, 'a> {
    options: &'h BuildOptions,
    hooks: &'h mut [&'a mut dyn ResolveHook],
    metafile: Metafile,
    visited: BTreeSet<PathBuf>,
    externals: Vec<String>,
    body: String,
}

fn import_pattern() -> Regex {
    Regex::new(r#"(?m)^\s*(?:import|export)(?:[^;'"]*?\bfrom)?\s*["']([^"']+)["'];?\s*$"#).unwrap()
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skew(mut self, suffix: &str) -> Self {
        self.skew = Some(suffix.to_string());
        self
    }

    pub fn build_count(&self) -> usize {
        self.builds.borrow().len()
    }

    fn key(&self, options: &BuildOptions, path: &Path) -> String {
        paths::to_posix(&paths::relative(&options.working_dir, path))
    }

    fn dispatch(
        hooks: &mut [&mut dyn ResolveHook],
        args: &ResolveArgs,
    ) -> Result<ResolveOutcome, BuildError> {
        for hook in hooks.iter_mut() {
            if !hook.wants(&args.path) {
                continue;
            }
            let outcome = hook.on_resolve(args)?;
            if outcome != ResolveOutcome::None {
                return Ok(outcome);
            }
        }
        Ok(ResolveOutcome::None)
    }

    fn visit(&self, walk: &mut Walk<'_, '_>, file: &Path) -> Result<(), BuildError> {
        let file = paths::normalize(file);
        if !walk.visited.insert(file.clone()) {
            return Ok(());
        }
        let source = fs::read_to_string(&file).map_err(|e| failure(&format!("{e}"), None, None))?;
        let key = self.key(walk.options, &file);
        let mut bytes = source.len() as u64;
        if self.skew.as_ref().is_some_and(|s| key.ends_with(s.as_str())) {
            bytes += 1;
        }

        let resolve_dir = file.parent().unwrap().to_path_buf();
        let mut imports = Vec::new();
        let mut follow = Vec::new();
        let pattern = import_pattern();
        for (line_index, caps) in source
            .lines()
            .enumerate()
            .filter_map(|(i, line)| pattern.captures(line).map(|c| (i, c)))
        {
            let specifier = caps[1].to_string();
            let args = ResolveArgs {
                path: specifier.clone(),
                importer: file.to_string_lossy().to_string(),
                resolve_dir: resolve_dir.clone(),
                kind: ResolveKind::ImportStatement,
                namespace: "file".to_string(),
            };
            match Self::dispatch(walk.hooks, &args)? {
                ResolveOutcome::External(replacement) => {
                    walk.externals.push(replacement.clone());
                    imports.push(MetafileImport {
                        path: replacement,
                        kind: ResolveKind::ImportStatement,
                        external: true,
                        original: Some(specifier),
                    });
                }
                ResolveOutcome::Path(resolved) => {
                    imports.push(MetafileImport {
                        path: self.key(walk.options, &resolved),
                        kind: ResolveKind::ImportStatement,
                        external: false,
                        original: Some(specifier),
                    });
                    follow.push(resolved);
                }
                ResolveOutcome::None => {
                    let location = Location {
                        file: key.clone(),
                        line: line_index as u32 + 1,
                        column: 0,
                    };
                    match resolve(&resolve_dir, &specifier) {
                        Some(resolved) => {
                            imports.push(MetafileImport {
                                path: self.key(walk.options, &resolved),
                                kind: ResolveKind::ImportStatement,
                                external: false,
                                original: Some(specifier),
                            });
                            follow.push(resolved);
                        }
                        None if is_builtin(&specifier) && walk.options.platform == Platform::Node => {
                            walk.externals.push(specifier.clone());
                            imports.push(MetafileImport {
                                path: specifier,
                                kind: ResolveKind::ImportStatement,
                                external: true,
                                original: None,
                            });
                        }
                        None if is_builtin(&specifier) => {
                            return Err(failure(
                                &format!("Could not resolve \"{specifier}\""),
                                Some(location),
                                Some(format!(
                                    "The package \"{specifier}\" wasn't found on the file system but is built into node. Are you trying to bundle for node? You can use \"platform: 'node'\" to do that, which will remove this error."
                                )),
                            ));
                        }
                        None => {
                            return Err(failure(
                                &format!("Could not resolve \"{specifier}\""),
                                Some(location),
                                None,
                            ));
                        }
                    }
                }
            }
        }

        walk.metafile
            .inputs
            .insert(key, MetafileInput { bytes, imports });
        for line in source.lines().filter(|l| !pattern.is_match(l)) {
            walk.body.push_str(line);
            walk.body.push('\n');
        }
        for next in follow {
            self.visit(walk, &next)?;
        }
        Ok(())
    }
}

fn failure(text: &str, location: Option<Location>, note: Option<String>) -> BuildError {
    let mut message = Message::new(text);
    message.location = location;
    if let Some(note) = note {
        message.notes.push(Note {
            text: note,
            location: None,
        });
    }
    BuildError::Failed(BuildFailure {
        errors: vec![message],
        warnings: Vec::new(),
    })
}

fn is_builtin(specifier: &str) -> bool {
    specifier.starts_with("node:") || NODE_BUILTINS.contains(&specifier)
}

fn resolve_file(base: &Path) -> Option<PathBuf> {
    let mut candidates = vec![base.to_path_buf()];
    for ext in ["ts", "tsx", "js", "jsx"] {
        candidates.push(PathBuf::from(format!("{}.{ext}", base.display())));
    }
    for index in ["index.ts", "index.js"] {
        candidates.push(base.join(index));
    }
    candidates.into_iter().find(|c| c.is_file()).map(|c| paths::normalize(&c))
}

fn resolve(resolve_dir: &Path, specifier: &str) -> Option<PathBuf> {
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        return resolve_file(&paths::normalize(&resolve_dir.join(specifier)));
    }
    for dir in resolve_dir.ancestors() {
        let candidate = dir.join("node_modules").join(specifier);
        if let Some(found) = resolve_file(&candidate) {
            return Some(found);
        }
    }
    None
}

impl BuildTool for FakeTool {
    fn build(
        &self,
        options: &BuildOptions,
        hooks: &mut [&mut dyn ResolveHook],
    ) -> Result<BuildOutput, BuildError> {
        self.builds.borrow_mut().push(options.clone());

        for entry_point in &options.entry_points {
            let args = ResolveArgs {
                path: entry_point.to_string_lossy().to_string(),
                importer: String::new(),
                resolve_dir: options.working_dir.clone(),
                kind: ResolveKind::EntryPoint,
                namespace: "file".to_string(),
            };
            Self::dispatch(hooks, &args)?;
        }

        let mut metafile = Metafile::default();
        let mut output_files = Vec::new();
        for entry_point in &options.entry_points {
            let mut walk = Walk {
                options,
                hooks: &mut *hooks,
                metafile: Metafile::default(),
                visited: BTreeSet::new(),
                externals: Vec::new(),
                body: String::new(),
            };
            self.visit(&mut walk, entry_point)?;

            let rel = paths::to_posix(&paths::relative(&options.outbase, entry_point));
            let out = format!("{}.js", paths::strip_extension(&rel));
            let mut text = String::new();
            for external in &walk.externals {
                text.push_str(&format!("import \"{external}\";\n"));
            }
            text.push_str(&walk.body);
            if options.source_maps {
                output_files.push(OutputFile {
                    path: PathBuf::from(format!("{out}.map")),
                    text: format!("{{\"version\":3,\"sources\":[\"{rel}\"]}}"),
                });
            }
            output_files.push(OutputFile {
                path: PathBuf::from(out),
                text,
            });
            metafile.inputs.append(&mut walk.metafile.inputs);
        }

        Ok(BuildOutput {
            output_files,
            metafile,
            errors: Vec::new(),
            warnings: Vec::new(),
        })
    }
}
