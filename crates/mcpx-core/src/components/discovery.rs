//! Component File Discovery
//!
//! Walks a directory tree and returns the files whose base name marks them as
//! a tool, resource or prompt source.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;
use tokio::fs;
use tracing::{debug, warn};

use super::types::ComponentKind;
use crate::error::{Error, Result};

/// Accepted source extensions, in resolution priority order
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["ts", "js"];

/// Directory names never descended into
const SKIPPED_DIRS: [&str; 1] = ["node_modules"];

/// A discovered component source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSourceFile {
    /// Absolute path, the file's identity
    pub path: PathBuf,
    /// Kind implied by the file name
    pub kind: ComponentKind,
    /// Source modification time
    pub modified_at: SystemTime,
}

/// Outcome of scanning a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The directory does not exist; treated as "feature disabled"
    Missing,
    /// The directory exists; matching files in no particular order
    Found(Vec<ComponentSourceFile>),
}

impl Discovery {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Discovered files, empty when the directory is missing
    pub fn into_files(self) -> Vec<ComponentSourceFile> {
        match self {
            Self::Missing => Vec::new(),
            Self::Found(files) => files,
        }
    }
}

/// Decides which file names are component sources
#[derive(Debug, Clone)]
pub struct FileMatcher {
    extensions: Vec<String>,
    pattern: Option<(Regex, ComponentKind)>,
}

impl Default for FileMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }
}

impl FileMatcher {
    /// Match `tool|resource|prompt.<ext>` for the given extensions
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions,
            pattern: None,
        }
    }

    /// Replace base-name matching with a file-name pattern; matches are
    /// reported as `kind`
    pub fn with_pattern(mut self, pattern: Regex, kind: ComponentKind) -> Self {
        self.pattern = Some((pattern, kind));
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Kind of the file at `path`, if it is a component source
    pub fn classify(&self, path: &Path) -> Option<ComponentKind> {
        let extension = path.extension()?.to_str()?;
        if !self.extensions.iter().any(|e| e == extension) {
            return None;
        }

        if let Some((pattern, kind)) = &self.pattern {
            let name = path.file_name()?.to_str()?;
            return pattern.is_match(name).then_some(*kind);
        }

        ComponentKind::from_file_stem(path.file_stem()?.to_str()?)
    }
}

/// Recursively scan `root` for component source files
///
/// A missing root yields [`Discovery::Missing`]. A root that exists but
/// cannot be read is an error; unreadable subdirectories are skipped with a
/// warning.
pub async fn discover(root: &Path, matcher: &FileMatcher) -> Result<Discovery> {
    match fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(Error::DirectoryScan {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Discovery::Missing),
        Err(source) => {
            return Err(Error::DirectoryScan {
                path: root.to_path_buf(),
                source,
            });
        }
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(source) if dir == root => {
                return Err(Error::DirectoryScan {
                    path: dir,
                    source,
                });
            }
            Err(e) => {
                warn!(path = %dir.display(), "Skipping unreadable directory: {}", e);
                continue;
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if name.starts_with('.') {
                continue;
            }

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if !SKIPPED_DIRS.contains(&&*name) {
                    pending.push(path);
                }
                continue;
            }

            let Some(kind) = matcher.classify(&path) else {
                continue;
            };

            let modified_at = entry.metadata().await?.modified()?;
            debug!(kind = %kind, path = %path.display(), "Discovered component source");
            files.push(ComponentSourceFile {
                path,
                kind,
                modified_at,
            });
        }
    }

    Ok(Discovery::Found(files))
}
