//! [`BuildTool`] backed by the `esbuild` executable.
//!
//! The executable has no plugin protocol, so hooks are honoured from the
//! outside. Hooks that only mark packages external become `--external:`
//! flags. Dynamic hooks are replayed over the metafile of a first build; any
//! import they rewrite is then marked external in one build per entry point
//! and the emitted specifier is replaced with the hook's.

use crate::build_tool::{
    BuildError, BuildFailure, BuildOptions, BuildOutput, BuildTool, HookPlan, Location, Message,
    Metafile, Note, OutputFile, ResolveArgs, ResolveHook, ResolveKind, ResolveOutcome,
    OUTPUT_FORMAT, TARGET,
};
use crate::errors::BundleError;
use crate::paths;
use cvx_config::{resolve_esbuild_exe, UserConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

static MESSAGE_START: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\S*\s*\[(ERROR|WARNING)\]\s+(.*)$").ok());
static LOCATION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^ {4}(\S.*):(\d+):(\d+):$").ok());

pub struct EsbuildCli {
    exe: PathBuf,
}

/// What one invocation of the executable produced.
struct Run {
    /// Where the files were written; gone once the run returns.
    outdir: PathBuf,
    output_files: Vec<OutputFile>,
    metafile: Metafile,
    warnings: Vec<Message>,
}

/// An import a dynamic hook asked to leave in place under a new name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rewrite {
    importer: String,
    specifier: String,
    target: PathBuf,
    replacement: String,
}

impl EsbuildCli {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        EsbuildCli { exe: exe.into() }
    }

    /// Find esbuild through the user config, the project's `node_modules`, or `PATH`.
    pub fn locate(user_config: &UserConfig, project_dir: &Path) -> Result<Self, BundleError> {
        Ok(Self::new(resolve_esbuild_exe(user_config, project_dir)?))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    fn run(
        &self,
        options: &BuildOptions,
        entry_points: &[PathBuf],
        externals: &[String],
    ) -> Result<Run, BuildError> {
        let scratch = TempDir::new()
            .map_err(|e| BundleError::fatal(format!("Failed to create build directory: {e}")))?;
        let outdir = scratch.path().join("out");
        let metafile_path = scratch.path().join("meta.json");

        let args = command_args(options, entry_points, externals, &outdir, &metafile_path);
        let mut cmd = Command::new(&self.exe);
        cmd.args(&args).current_dir(&options.working_dir);
        debug!("Running: {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            BundleError::fatal(format!("Failed to run {}: {e}", self.exe.display()))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let (mut errors, warnings) = parse_messages(&stderr);

        if !output.status.success() {
            if errors.is_empty() {
                errors.push(Message::new(format!(
                    "esbuild exited with {}: {}",
                    output.status,
                    stderr.trim()
                )));
            }
            return Err(BuildError::Failed(BuildFailure { errors, warnings }));
        }

        let metafile_json = fs::read_to_string(&metafile_path).map_err(|e| {
            BundleError::fatal(format!("esbuild did not write a metafile: {e}"))
        })?;
        let metafile: Metafile = serde_json::from_str(&metafile_json)
            .map_err(|e| BundleError::fatal(format!("Unreadable esbuild metafile: {e}")))?;
        let output_files = read_outputs(&outdir)?;

        Ok(Run {
            outdir,
            output_files,
            metafile,
            warnings,
        })
    }
}

impl BuildTool for EsbuildCli {
    fn build(
        &self,
        options: &BuildOptions,
        hooks: &mut [&mut dyn ResolveHook],
    ) -> Result<BuildOutput, BuildError> {
        let static_externals = static_externals(hooks);
        let has_dynamic = hooks.iter().any(|h| h.plan() == HookPlan::Dynamic);

        let first = self.run(options, &options.entry_points, &static_externals)?;

        let mut rewrites = Vec::new();
        if has_dynamic {
            rewrites = replay(options, &first.metafile, hooks, true)?;
        }

        let run = if rewrites.is_empty() {
            first
        } else {
            if options.splitting {
                return Err(BundleError::fatal(
                    "Imports rewritten by resolve hooks are not supported in split builds",
                )
                .into());
            }
            self.run_per_entry_point(options, &static_externals, &rewrites)?
        };

        replay(options, &run.metafile, hooks, false)?;

        Ok(BuildOutput {
            output_files: run.output_files,
            metafile: run.metafile,
            errors: Vec::new(),
            warnings: run.warnings,
        })
    }
}

impl EsbuildCli {
    /// Build each entry point alone so the other rewritten files can be
    /// marked external without marking an entry point external.
    fn run_per_entry_point(
        &self,
        options: &BuildOptions,
        static_externals: &[String],
        rewrites: &[Rewrite],
    ) -> Result<Run, BuildError> {
        let mut merged = Run {
            outdir: PathBuf::new(),
            output_files: Vec::new(),
            metafile: Metafile::default(),
            warnings: Vec::new(),
        };
        for entry_point in &options.entry_points {
            let entry_point = paths::normalize(entry_point);
            let mut externals = static_externals.to_vec();
            let targets: BTreeSet<String> = rewrites
                .iter()
                .filter(|r| r.target != entry_point)
                .map(|r| r.target.to_string_lossy().to_string())
                .collect();
            externals.extend(targets);

            let mut run = self.run(options, std::slice::from_ref(&entry_point), &externals)?;
            let applicable: Vec<&Rewrite> = rewrites
                .iter()
                .filter(|r| r.target != entry_point && run.metafile.inputs.contains_key(&r.importer))
                .collect();
            for file in run.output_files.iter_mut().filter(|f| !is_source_map(&f.path)) {
                let emitted = run.outdir.join(&file.path);
                let emitted_dir = emitted.parent().unwrap_or(run.outdir.as_path());
                file.text = apply_rewrites(&file.text, &applicable, emitted_dir);
            }

            merged.output_files.append(&mut run.output_files);
            merged.metafile.inputs.append(&mut run.metafile.inputs);
            for warning in run.warnings {
                if !merged.warnings.contains(&warning) {
                    merged.warnings.push(warning);
                }
            }
        }
        Ok(merged)
    }
}

fn is_source_map(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "map")
}

/// Packages every static hook wants external, with their subpaths.
fn static_externals(hooks: &[&mut dyn ResolveHook]) -> Vec<String> {
    let mut packages = BTreeSet::new();
    for hook in hooks {
        if let HookPlan::Externals(names) = hook.plan() {
            packages.extend(names);
        }
    }
    packages
        .into_iter()
        .flat_map(|name| [format!("{name}/*"), name])
        .collect()
}

pub(crate) fn command_args(
    options: &BuildOptions,
    entry_points: &[PathBuf],
    externals: &[String],
    outdir: &Path,
    metafile: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = entry_points
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    args.push("--bundle".to_string());
    args.push(format!("--platform={}", options.platform.as_str()));
    args.push(format!("--format={OUTPUT_FORMAT}"));
    args.push(format!("--target={TARGET}"));
    if options.jsx_automatic {
        args.push("--jsx=automatic".to_string());
    }
    args.push(format!("--outdir={}", outdir.display()));
    args.push(format!("--outbase={}", options.outbase.display()));
    if options.source_maps {
        args.push("--sourcemap".to_string());
    }
    if options.splitting {
        args.push("--splitting".to_string());
    }
    if let Some(chunk_names) = &options.chunk_names {
        args.push(format!("--chunk-names={chunk_names}"));
    }
    args.push(format!("--tree-shaking={}", options.tree_shaking));
    if options.minify.syntax {
        args.push("--minify-syntax".to_string());
    }
    if options.minify.identifiers {
        args.push("--minify-identifiers".to_string());
    }
    if options.minify.whitespace {
        args.push("--minify-whitespace".to_string());
    }
    if options.keep_names {
        args.push("--keep-names".to_string());
    }
    for (key, value) in &options.define {
        args.push(format!("--define:{key}={value}"));
    }
    args.push(format!("--conditions={}", options.conditions.join(",")));
    args.push(format!("--metafile={}", metafile.display()));
    args.push("--log-level=warning".to_string());
    args.push("--log-limit=0".to_string());
    args.push("--color=false".to_string());
    for external in externals {
        args.push(format!("--external:{external}"));
    }
    args
}

/// Split esbuild's stderr into errors and warnings.
pub(crate) fn parse_messages(stderr: &str) -> (Vec<Message>, Vec<Message>) {
    let (Some(start), Some(location)) = (MESSAGE_START.as_ref(), LOCATION.as_ref()) else {
        return (Vec::new(), Vec::new());
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut current: Option<(bool, Message)> = None;

    let mut flush = |current: &mut Option<(bool, Message)>| {
        if let Some((is_error, message)) = current.take() {
            if is_error {
                errors.push(message);
            } else {
                warnings.push(message);
            }
        }
    };

    for line in stderr.lines() {
        if let Some(caps) = start.captures(line) {
            flush(&mut current);
            current = Some((&caps[1] == "ERROR", Message::new(&caps[2])));
            continue;
        }
        let Some((_, message)) = current.as_mut() else {
            continue;
        };
        if let Some(caps) = location.captures(line) {
            let loc = Location {
                file: caps[1].to_string(),
                line: caps[2].parse().unwrap_or(0),
                column: caps[3].parse().unwrap_or(0),
            };
            match message.notes.last_mut() {
                Some(note) if note.location.is_none() => note.location = Some(loc),
                _ if message.location.is_none() => message.location = Some(loc),
                _ => {}
            }
        } else if line.starts_with("  ") && !line.starts_with("   ") {
            message.notes.push(Note {
                text: line.trim().to_string(),
                location: None,
            });
        }
    }
    flush(&mut current);
    (errors, warnings)
}

fn read_outputs(outdir: &Path) -> Result<Vec<OutputFile>, BundleError> {
    let mut files = Vec::new();
    if !outdir.exists() {
        return Ok(files);
    }
    for entry in WalkDir::new(outdir).sort_by_file_name() {
        let entry =
            entry.map_err(|e| BundleError::fatal(format!("Failed to read esbuild output: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let text = fs::read_to_string(entry.path()).map_err(|e| {
            BundleError::fatal(format!("Failed to read {}: {e}", entry.path().display()))
        })?;
        let rel = entry
            .path()
            .strip_prefix(outdir)
            .map_err(|e| BundleError::fatal(e.to_string()))?;
        files.push(OutputFile {
            path: rel.to_path_buf(),
            text,
        });
    }
    Ok(files)
}

/// Namespace of a metafile input key: `file` unless the key carries a prefix.
fn namespace_of(key: &str) -> &str {
    match key.split_once(':') {
        Some((prefix, _)) if prefix.len() > 1 && !prefix.contains(['/', '\\']) => prefix,
        _ => "file",
    }
}

/// Feed the build's entry points and imports through the hooks.
///
/// With `dynamic` set only dynamic hooks are consulted and their `External`
/// outcomes are returned; otherwise only static hooks are consulted.
fn replay(
    options: &BuildOptions,
    metafile: &Metafile,
    hooks: &mut [&mut dyn ResolveHook],
    dynamic: bool,
) -> Result<Vec<Rewrite>, BundleError> {
    let selected = |hook: &dyn ResolveHook| (hook.plan() == HookPlan::Dynamic) == dynamic;
    let mut rewrites = Vec::new();

    for entry_point in &options.entry_points {
        let args = ResolveArgs {
            path: entry_point.to_string_lossy().to_string(),
            importer: String::new(),
            resolve_dir: options.working_dir.clone(),
            kind: ResolveKind::EntryPoint,
            namespace: "file".to_string(),
        };
        dispatch(hooks, &selected, &args)?;
    }

    for (key, input) in &metafile.inputs {
        let importer = options.working_dir.join(key);
        let resolve_dir = importer
            .parent()
            .map_or_else(|| options.working_dir.clone(), Path::to_path_buf);
        for import in &input.imports {
            if import.path.starts_with('<') {
                continue;
            }
            let specifier = import.original.clone().unwrap_or_else(|| import.path.clone());
            let args = ResolveArgs {
                path: specifier.clone(),
                importer: importer.to_string_lossy().to_string(),
                resolve_dir: resolve_dir.clone(),
                kind: import.kind,
                namespace: namespace_of(key).to_string(),
            };
            if let ResolveOutcome::External(replacement) = dispatch(hooks, &selected, &args)? {
                if dynamic && !import.external {
                    rewrites.push(Rewrite {
                        importer: key.clone(),
                        specifier,
                        target: paths::normalize(&options.working_dir.join(&import.path)),
                        replacement,
                    });
                }
            }
        }
    }
    Ok(rewrites)
}

/// First non-`None` outcome among the selected hooks that want the path.
fn dispatch(
    hooks: &mut [&mut dyn ResolveHook],
    selected: &impl Fn(&dyn ResolveHook) -> bool,
    args: &ResolveArgs,
) -> Result<ResolveOutcome, BundleError> {
    for hook in hooks.iter_mut() {
        if !selected(&**hook) || !hook.wants(&args.path) {
            continue;
        }
        let outcome = hook.on_resolve(args)?;
        if outcome != ResolveOutcome::None {
            debug!("{} resolved {} to {:?}", hook.name(), args.path, outcome);
            return Ok(outcome);
        }
    }
    Ok(ResolveOutcome::None)
}

/// Replace every form esbuild may have emitted for a rewritten import.
fn apply_rewrites(text: &str, rewrites: &[&Rewrite], emitted_dir: &Path) -> String {
    let mut text = text.to_string();
    for rewrite in rewrites {
        let relative = paths::to_posix(&paths::relative(emitted_dir, &rewrite.target));
        let relative = if relative.starts_with("../") {
            relative
        } else {
            format!("./{relative}")
        };
        let forms = [
            rewrite.specifier.clone(),
            rewrite.target.to_string_lossy().to_string(),
            relative,
        ];
        for form in &forms {
            for quote in ['"', '\''] {
                text = text.replace(
                    &format!("{quote}{form}{quote}"),
                    &format!("{quote}{}{quote}", rewrite.replacement),
                );
            }
        }
    }
    text
}
