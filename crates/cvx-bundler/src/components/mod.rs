//! Components: directories holding a `convex.config` definition file.
//!
//! Discovery runs two builds over the project. The first starts at the root
//! definition and follows imports of other definition files to find the
//! component graph. The second bundles every definition at once, replacing
//! imports of other components with encoded references the deployment
//! resolves later. Implementations (functions, schema, auth) are then bundled
//! per component directory and merged with the definitions.

pub mod definition_path;
pub mod definitions;
pub mod directory;
pub mod discover;
pub mod implementations;
pub mod plugin;

pub use definition_path::{
    decode_definition_import, encode_definition_import, to_definition_path,
    ComponentDefinitionPath, COMPONENT_DEPS_PREFIX,
};
pub use definitions::{bundle_definitions, DefinitionBundles, DefinitionSpec};
pub use directory::{
    is_component_directory, ComponentDirectory, NotAComponent, DEFINITION_FILENAME_JS,
    DEFINITION_FILENAME_TS, DEFINITION_MARKER,
};
pub use discover::{component_graph, ComponentGraph};
pub use implementations::{
    bundle_app, bundle_implementations, AppImplementation, ComponentImplementation,
    ImplementationOptions, Implementations,
};
pub use plugin::{ComponentHook, ComponentHookMode};
