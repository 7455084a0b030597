mod cli;
mod config;
mod errors;
mod format;
mod intake;
mod llm_client;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on malformed values; the API key is checked per review)
    let config = Config::from_env()?;

    // Initialize structured logging on stderr so stdout carries only the reviews
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting intake reviewer v{}", env!("CARGO_PKG_VERSION"));

    cli::run(cli, config).await
}
