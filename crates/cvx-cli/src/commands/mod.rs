pub mod bundle;
pub mod components;
pub mod config;
pub mod entry_points;

use clap::Args;
use std::path::PathBuf;

/// Selects the functions directory a read-only command inspects.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Functions directory (defaults to `functions` in convex.json, else ./convex)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}
