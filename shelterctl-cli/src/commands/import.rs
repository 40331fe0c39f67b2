//! CSV import command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use shelterctl_core::{import_csv, ShelterConfig};

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// CSV file with `name;species;skin;age` rows after a header line
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Replace all pets in both stores with the file's contents.
pub async fn run_import(args: ImportArgs, config: ShelterConfig) -> Result<()> {
    let store = shelterctl_server::connect(&config)
        .await
        .context("Failed to connect to stores")?;

    let summary = import_csv(&store, &args.path)
        .await
        .with_context(|| format!("Failed to import {}", args.path.display()))?;

    println!("Imported {} pets into MongoDB and PostgreSQL", summary.imported);
    Ok(())
}
