use crate::common::GlobalOpts;
use anyhow::Context;
use clap::Subcommand;
use colored::Colorize;
use cvx_config::UserConfig;
use cvx_logger::Logger;
use std::path::Path;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    Show,
    Set {
        key: String,
        value: String,
    },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, future runs read the config from there.
    /// If omitted, the CLI prints the current configuration file path.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(
    action: Option<ConfigAction>,
    opts: &GlobalOpts,
    logger: &Logger,
) -> anyhow::Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = UserConfig::load().context("Failed to load config")?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = UserConfig::load().context("Failed to load config")?;
            config.set(&key, &value)?;
            config.save().context("Failed to save config")?;
            logger.success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path { new_path } => match new_path {
            Some(p) => {
                let pointer = UserConfig::set_path(Path::new(&p))
                    .context("Failed to set config path")?;
                logger.debug(&format!("Wrote {}", pointer.display()));
                logger.success(&format!("Config path set to {}", p));
            }
            None => {
                let path = UserConfig::path()?;
                println!("{}", path.display());
            }
        },
    }
    Ok(())
}
