//! Bundling for cvx projects
//!
//! Turns a functions directory into a deployable payload:
//! - [`entry_points`] walks the tree and classifies files
//! - [`environment`] decides whether each entry point runs in the isolate or in node
//! - [`bundle`] drives the build tool with a fixed configuration and checks
//!   that nothing changed under it
//! - [`components`] discovers the component graph and bundles definitions
//! - [`assembler`] merges definitions and implementations into one payload
//!
//! The build tool sits behind the [`BuildTool`] trait; [`EsbuildCli`] is the
//! production implementation.

pub mod assembler;
pub mod build_tool;
pub mod bundle;
pub mod components;
pub mod context;
pub mod entry_points;
pub mod environment;
pub mod errors;
pub mod esbuild;
pub mod externals;
pub mod integrity;
pub mod paths;
pub mod pipeline;
pub mod source_tree;

pub use assembler::{
    assemble, assemble_app, AppDefinitionConfig, ComponentDefinitionConfig, StartPushPayload,
};
pub use build_tool::{
    BuildError, BuildFailure, BuildOptions, BuildOutput, BuildTool, HookPlan, Location, Message,
    Metafile, MetafileImport, MetafileInput, Minify, Note, OutputFile, Platform, ResolveArgs,
    ResolveHook, ResolveKind, ResolveOutcome,
};
pub use bundle::{
    bundle, bundle_auth_config, bundle_schema, Bundle, BundleRequest, BundleResult,
    DEFAULT_CHUNKS_FOLDER, NODE_CHUNKS_FOLDER,
};
pub use context::BundleContext;
pub use entry_points::{classify, entry_points, EntryPoint, EntryPointKind};
pub use environment::{
    entry_points_by_environment, must_be_isolate, resolve_environment, EntryPointsByEnvironment,
    ModuleEnvironment,
};
pub use errors::{BundleError, ErrorKind};
pub use esbuild::EsbuildCli;
pub use pipeline::{bundle_project, ProjectRequest};
pub use source_tree::SourceTree;
