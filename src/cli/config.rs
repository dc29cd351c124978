use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use refmonster::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Read one value (e.g. `search.max_concurrency`)
    Get { key: String },

    /// Write one value and save the file
    Set { key: String, value: String },
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = Config::load_from(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            println!("{}", resolve_path(config_path)?.display());
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_from(config_path)?;
            println!("{}", config.get_value(&key)?);
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(config_path)?;
            config.set_value(&key, &value)?;
            config.validate()?;

            let path = resolve_path(config_path)?;
            config.save(&path)?;
            println!("Set {} = {}", key, value);
        }
    }

    Ok(())
}

fn resolve_path(config_path: Option<&str>) -> Result<PathBuf> {
    match config_path {
        Some(p) => Ok(PathBuf::from(shellexpand::tilde(p).to_string())),
        None => Config::config_path(),
    }
}
