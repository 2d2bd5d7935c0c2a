//! Marknote CLI
//!
//! Command-line client for the Marknote notes backend.
//!
//! AI answers are streamed to stdout as they arrive. When the backend has
//! no streaming endpoint for an operation the answer is fetched in one
//! call and replayed, so the output looks the same either way. Logs go to
//! stderr.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod commands;
mod config;

use commands::Command;
use config::CliConfig;
use marknote_client::{FileTokenStore, MarknoteClient};

#[derive(Parser, Debug)]
#[command(name = "marknote")]
#[command(author, version, about = "Marknote notes and AI assistant client", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "marknote.yaml")]
    pub config: PathBuf,

    /// Backend API base URL
    #[arg(short, long, env = "MARKNOTE_BASE_URL")]
    pub base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = CliConfig::load(&cli.config, &cli)?;
    debug!("Configuration loaded from {:?}", cli.config);
    info!("Backend: {}", config.client.base_url);

    let credentials_path = config.credentials_path()?;
    debug!("Credentials: {:?}", credentials_path);
    let tokens = Arc::new(FileTokenStore::open(credentials_path));

    let client = MarknoteClient::from_config(config.client, tokens)?;
    commands::run(cli.command, &client).await
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("marknote=debug,marknote_core=debug,marknote_client=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("marknote=info,marknote_client=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
