//! Diagnostics command.

use anyhow::Result;
use colored::Colorize;
use mcpx_core::config::CONFIG_FILE;
use mcpx_core::{ComponentKind, ProjectConfig};

use super::{KindScan, display_path, scan_kind};

pub async fn execute(config: &ProjectConfig) -> Result<()> {
    println!("{}", "mcpx Doctor".cyan().bold());
    println!("{}", "─".repeat(50));
    println!();

    let mut issues = Vec::new();

    println!("  Project: {}", config.root().display());

    // Check config file
    print!("  Config file: ");
    if config.root().join(CONFIG_FILE).exists() {
        println!("{}", "✓ exists".green());
    } else {
        println!("{}", "○ not found (using defaults)".yellow());
    }

    // Check configuration
    print!("  Configuration: ");
    match config.validate() {
        Ok(()) => println!("{}", "✓ valid".green()),
        Err(e) => {
            println!("{}", format!("✗ {}", e).red());
            issues.push(format!("Invalid configuration: {e}"));
        }
    }

    print!("  Staging directory: ");
    let staging = config.staging_dir();
    if staging.exists() {
        println!("{} {}", "✓".green(), staging.display());
    } else {
        println!("{} {} (created on first build)", "○".yellow(), staging.display());
    }

    println!("  Extensions: {}", config.extensions.join(", "));
    println!("  Cache policy: {:?}", config.cache_policy);

    // Check component directories
    println!();
    println!("  {}", "Components:".cyan());
    for kind in ComponentKind::ALL {
        print!("    {}: ", kind.plural());
        match scan_kind(config, kind).await {
            Ok(KindScan::Disabled) => println!("{}", "○ disabled".yellow()),
            Ok(KindScan::Missing(dir)) => {
                println!("{}", format!("✗ {} missing", display_path(config, &dir)).red());
                issues.push(format!(
                    "{} directory {} does not exist; create it or set enabled = false",
                    kind.plural(),
                    dir.display()
                ));
            }
            Ok(KindScan::Found(dir, files)) => println!(
                "{} {} file(s) in {}",
                "✓".green(),
                files.len(),
                display_path(config, &dir)
            ),
            Err(e) => {
                println!("{}", format!("✗ {}", e).red());
                issues.push(format!("Cannot scan {}: {e}", kind.plural()));
            }
        }
    }

    // Check compiler
    println!();
    print!("  Compiler: ");
    match config.compiler.command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => match which::which(command) {
            Ok(path) => println!("{} {}", "✓".green(), path.display()),
            Err(_) => {
                println!("{}", format!("✗ {} not found", command).red());
                issues.push(format!("Compiler '{command}' is not installed"));
            }
        },
        _ => println!("{}", "○ passthrough (sources must already be executable)".yellow()),
    }

    // Summary
    println!();
    if issues.is_empty() {
        println!("{}", "✓ All checks passed".green().bold());
    } else {
        println!("{}", format!("✗ {} issue(s) found:", issues.len()).red().bold());
        for issue in &issues {
            println!("  • {}", issue);
        }
    }

    Ok(())
}
