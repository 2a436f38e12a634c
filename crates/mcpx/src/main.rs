//! mcpx - component server developer CLI
//!
//! Front end over `mcpx-core`: discovery, the compilation cache and project
//! diagnostics.

use anyhow::{Context, Result};
use clap::Parser;
use mcpx_core::ProjectConfig;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("mcpx={level}").parse()?)
                .add_directive(format!("mcpx_core={level}").parse()?),
        )
        .init();

    // Load configuration
    let config = ProjectConfig::load(&cli.project).with_context(|| {
        format!("Failed to load configuration from {}", cli.project.display())
    })?;
    debug!(
        project = %config.root().display(),
        staging = %config.staging_dir().display(),
        "Loaded configuration"
    );

    // Execute command
    match cli.command {
        Commands::Discover { json } => commands::discover::execute(&config, json).await,
        Commands::Build => commands::build::execute(&config).await,
        Commands::Clean => commands::clean::execute(&config).await,
        Commands::Doctor => commands::doctor::execute(&config).await,
    }
}
