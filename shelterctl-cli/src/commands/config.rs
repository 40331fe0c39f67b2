//! Configuration inspection

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use shelterctl_core::ShelterConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective config (file plus environment)
    Show,
    /// Show config file path
    Path,
    /// Write a config file with default values
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs, path: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Show => run_show(path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init(args) => run_init(args, path),
    }
}

fn run_show(path: &Path) -> Result<()> {
    let mut config = crate::load_config(path)?;
    if config.mongo.password.is_some() {
        config.mongo.password = Some("********".to_string());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn run_init(args: InitArgs, path: &Path) -> Result<()> {
    if path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            path
        ));
    }

    ShelterConfig::default()
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    Ok(())
}
