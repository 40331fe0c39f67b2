//! HTTP server command
//!
//! Flags override the config file, which is already overridden by environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use shelterctl_core::ShelterConfig;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Restrict CORS to localhost origins
    #[arg(long)]
    pub strict_cors: bool,

    /// PostgreSQL URL (overrides config/environment)
    #[arg(long)]
    pub database_url: Option<String>,

    /// MongoDB connection string (overrides config/environment)
    #[arg(long)]
    pub mongo_uri: Option<String>,

    /// Replace all pets from this CSV file before serving
    #[arg(long, value_name = "PATH")]
    pub seed_csv: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(&self, config: &mut ShelterConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind.to_string();
        }
        if self.strict_cors {
            config.server.cors_permissive = false;
        }
        if let Some(url) = &self.database_url {
            config.postgres.url.clone_from(url);
        }
        if let Some(uri) = &self.mongo_uri {
            config.mongo.uri = Some(uri.clone());
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, mut config: ShelterConfig) -> Result<()> {
    args.apply(&mut config);
    tracing::info!("Starting shelterctl server on {}", config.server.bind);

    // Blocks until shutdown
    shelterctl_server::serve(&config, args.seed_csv.as_deref())
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = ServeArgs::parse_from([
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--strict-cors",
            "--mongo-uri",
            "mongodb://db:27017",
        ]);
        let mut config = ShelterConfig::default();
        args.apply(&mut config);

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert!(!config.server.cors_permissive);
        assert_eq!(config.mongo.uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(config.postgres.url, ShelterConfig::default().postgres.url);
    }
}
