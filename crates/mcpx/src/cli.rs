//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Component server developer CLI
///
/// Discovers tools, resources and prompts, compiles them into the staging
/// directory and checks the project setup.
#[derive(Parser, Debug)]
#[command(name = "mcpx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root
    #[arg(short, long, global = true, env = "MCPX_PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List component source files per kind
    Discover {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile every discovered component into the staging directory
    Build,

    /// Remove the staging directory
    Clean,

    /// Check configuration, component directories and compiler
    Doctor,
}
