//! Compile every discovered component into the staging directory.

use anyhow::{Result, bail};
use colored::Colorize;
use mcpx_core::{ComponentKind, ProjectConfig};

use super::{KindScan, display_path, scan_kind};

pub async fn execute(config: &ProjectConfig) -> Result<()> {
    config.validate()?;
    let materializer = config.materializer();

    println!(
        "{} {}",
        "Staging:".cyan(),
        materializer.staging_dir().display()
    );

    let mut built = 0usize;
    let mut failures = Vec::new();

    for kind in ComponentKind::ALL {
        let KindScan::Found(_, files) = scan_kind(config, kind).await? else {
            continue;
        };

        for file in files {
            let shown = display_path(config, &file.path);
            match materializer.materialize(&file.path).await {
                Ok(artifact) => {
                    built += 1;
                    println!("  {} {} {}", "✓".green(), kind, shown);
                    for dependency in &artifact.dependencies {
                        println!("      {} {}", "↳".dimmed(), dependency.display());
                    }
                }
                Err(e) => {
                    println!("  {} {} {}", "✗".red(), kind, shown);
                    failures.push(format!("{shown}: {e}"));
                }
            }
        }
    }

    println!();
    println!(
        "{} built, {} compiled, {} cached",
        built,
        materializer.compile_count(),
        materializer.cache_len().await.saturating_sub(materializer.compile_count())
    );

    if !failures.is_empty() {
        println!("{}", format!("✗ {} component(s) failed:", failures.len()).red().bold());
        for failure in &failures {
            println!("  • {}", failure);
        }
        bail!("{} component(s) failed to build", failures.len());
    }

    Ok(())
}
