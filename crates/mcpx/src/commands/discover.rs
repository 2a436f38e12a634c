//! List component source files.

use anyhow::Result;
use colored::Colorize;
use mcpx_core::{ComponentKind, ProjectConfig};
use serde_json::json;

use super::{KindScan, display_path, scan_kind};

pub async fn execute(config: &ProjectConfig, json: bool) -> Result<()> {
    let mut report = serde_json::Map::new();

    for kind in ComponentKind::ALL {
        let scan = scan_kind(config, kind).await?;

        if json {
            let value = match &scan {
                KindScan::Disabled => json!({"status": "disabled"}),
                KindScan::Missing(dir) => {
                    json!({"status": "missing", "directory": dir.display().to_string()})
                }
                KindScan::Found(dir, files) => json!({
                    "status": "found",
                    "directory": dir.display().to_string(),
                    "files": files.iter().map(|f| display_path(config, &f.path)).collect::<Vec<_>>(),
                }),
            };
            report.insert(kind.plural().to_string(), value);
            continue;
        }

        print!("{} ", format!("{}:", kind.plural()).cyan().bold());
        match scan {
            KindScan::Disabled => println!("{}", "disabled".yellow()),
            KindScan::Missing(dir) => {
                println!("{}", format!("○ {} does not exist", display_path(config, &dir)).yellow())
            }
            KindScan::Found(dir, files) => {
                println!("{} in {}", files.len(), display_path(config, &dir));
                for file in &files {
                    println!("  {}", display_path(config, &file.path));
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
