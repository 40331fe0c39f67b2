//! Store timing benchmark

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use shelterctl_core::bench;

use crate::load_config;

#[derive(Parser, Debug)]
pub struct BenchArgs {
    /// Number of pets to generate
    #[arg(long, short = 'n', default_value_t = 10_000)]
    pub scale: usize,

    /// RNG seed for reproducible data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Confirm that every pet in both stores may be deleted
    #[arg(long)]
    pub yes: bool,
}

/// Run the benchmark against the configured stores and print the timings.
pub async fn run_bench(args: BenchArgs, config_path: &Path) -> Result<()> {
    if !args.yes {
        bail!("bench deletes every pet and empties every shelter in both stores; pass --yes to run it against a scratch database");
    }

    let config = load_config(config_path)?;
    let store = shelterctl_server::connect(&config)
        .await
        .context("Failed to connect to stores")?;

    let report = bench::run(store.stores(), args.scale, args.seed)
        .await
        .context("Benchmark failed")?;

    println!("{report}");
    Ok(())
}
