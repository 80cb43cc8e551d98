//! Configuration for the cvx CLI
//!
//! Two layers feed a bundling run:
//! - the user config (`cvx.toml`), holding tool preferences such as the esbuild path
//! - the project config (`convex.json`), holding the functions directory and the
//!   external-package allow list for the node environment
//!
//! [`node_paths`] locates the files both layers (and the bundler) depend on.

pub mod errors;
pub mod node_paths;
pub mod project_config;
pub mod user_config;

pub use errors::ConfigError;
pub use node_paths::{find_parent_configs, resolve_esbuild_exe, ParentConfigs};
pub use project_config::{NodeConfig, ProjectConfig};
pub use user_config::UserConfig;
