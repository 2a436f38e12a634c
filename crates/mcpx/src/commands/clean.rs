//! Remove the staging directory.

use anyhow::{Context, Result};
use colored::Colorize;
use mcpx_core::ProjectConfig;

pub async fn execute(config: &ProjectConfig) -> Result<()> {
    let materializer = config.materializer();
    let staging = materializer.staging_dir().to_path_buf();

    if !staging.exists() {
        println!("{}", format!("○ {} does not exist", staging.display()).yellow());
        return Ok(());
    }

    materializer
        .clean()
        .await
        .with_context(|| format!("Failed to remove {}", staging.display()))?;
    println!("{} Removed {}", "✓".green(), staging.display());

    Ok(())
}
