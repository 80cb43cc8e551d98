//! Common types and utilities shared across commands

use clap::Parser;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        help = "Suppress console output (still logged to file)"
    )]
    pub no_stdout: bool,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> String {
        let level = match self.verbosity_level() {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        ["cvx", "cvx_bundler", "cvx_config", "cvx_manifest", "cvx_ast", "cvx_fs"]
            .iter()
            .fold("warn".to_string(), |filter, target| {
                format!("{filter},{target}={level}")
            })
    }
}
