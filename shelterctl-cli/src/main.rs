//! shelterctl CLI - dual-store pet shelter backend
//!
//! - `serve`: HTTP API over MongoDB and PostgreSQL
//! - `import`: replace all pets from a `;`-separated CSV file
//! - `bench`: time the same workload against each store
//! - `config`: inspect and initialise ~/.shelterctl/config.toml

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use shelterctl_core::ShelterConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "shelterctl",
    author,
    version,
    about = "Pet shelter backend writing every record to MongoDB and PostgreSQL"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.shelterctl/config.toml)
    #[arg(long, global = true, env = "SHELTERCTL_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Replace all pets with the contents of a CSV file
    Import(commands::import::ImportArgs),
    /// Time bulk CRUD against each store (destroys existing pets)
    Bench(commands::bench::BenchArgs),
    /// Manage shelterctl configuration (show, path, init)
    Config(commands::config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Config file path from `--config`, or the default location
fn config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(ShelterConfig::config_path)
}

/// Load the config file, then apply environment overrides.
fn load_config(path: &std::path::Path) -> Result<ShelterConfig> {
    let mut config = ShelterConfig::load_from(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    let path = config_path(cli.config);

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, load_config(&path)?).await?,
        Commands::Import(args) => commands::run_import(args, load_config(&path)?).await?,
        Commands::Bench(args) => commands::run_bench(args, &path).await?,
        Commands::Config(args) => commands::run_config(args, &path)?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
