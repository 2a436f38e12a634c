//! Command implementations for the mcpx CLI.

pub mod build;
pub mod clean;
pub mod discover;
pub mod doctor;

use std::path::{Path, PathBuf};

use anyhow::Result;
use mcpx_core::ComponentKind;
use mcpx_core::ProjectConfig;
use mcpx_core::components::{ComponentSourceFile, Discovery, discover};

/// What scanning one kind's directory found
#[derive(Debug)]
pub enum KindScan {
    Disabled,
    Missing(PathBuf),
    Found(PathBuf, Vec<ComponentSourceFile>),
}

/// Scan the configured directory for `kind`, sorted by path
pub async fn scan_kind(config: &ProjectConfig, kind: ComponentKind) -> Result<KindScan> {
    let options = config.directories().get(kind).clone();
    if !options.enabled || options.directory.as_os_str().is_empty() {
        return Ok(KindScan::Disabled);
    }

    let matcher = options.matcher(kind, &config.extensions)?;
    match discover(&options.directory, &matcher).await? {
        Discovery::Missing => Ok(KindScan::Missing(options.directory)),
        Discovery::Found(files) => {
            let mut files: Vec<_> = files.into_iter().filter(|f| f.kind == kind).collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(KindScan::Found(options.directory, files))
        }
    }
}

/// `path` relative to the project root when inside it
pub fn display_path(config: &ProjectConfig, path: &Path) -> String {
    path.strip_prefix(config.root())
        .unwrap_or(path)
        .display()
        .to_string()
}
