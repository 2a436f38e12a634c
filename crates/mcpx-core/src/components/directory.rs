//! Directory Loader
//!
//! Runs discovery, materialization, loading and validation for one component
//! kind in one directory. A broken file never aborts the batch: its failure
//! is formatted into the result and the next file is processed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::discovery::{Discovery, discover};
use super::loader::DynamicLoader;
use super::types::{ComponentDefinition, ComponentKind};
use crate::build::Materializer;
use crate::config::DirectoryOptions;
use crate::error::{Error, Result};

/// A validated component and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedComponent {
    pub source: PathBuf,
    pub definition: ComponentDefinition,
}

/// Outcome of loading one directory
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoadResult {
    /// Validated components, in path order
    pub components: Vec<LoadedComponent>,
    /// One formatted message per failed file or directory
    pub errors: Vec<String>,
    /// The configured directory does not exist
    pub missing: bool,
}

impl DirectoryLoadResult {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.errors.is_empty()
    }
}

/// Loads every component of one kind from a directory
#[derive(Clone)]
pub struct DirectoryLoader {
    materializer: Arc<Materializer>,
    loader: DynamicLoader,
}

impl DirectoryLoader {
    pub fn new(materializer: Arc<Materializer>, loader: DynamicLoader) -> Self {
        Self {
            materializer,
            loader,
        }
    }

    pub fn materializer(&self) -> &Arc<Materializer> {
        &self.materializer
    }

    /// Load all `kind` components under `options.directory`
    pub async fn load_directory(
        &self,
        options: &DirectoryOptions,
        kind: ComponentKind,
    ) -> DirectoryLoadResult {
        let mut result = DirectoryLoadResult::default();

        if !options.enabled || options.directory.as_os_str().is_empty() {
            debug!(kind = %kind, "Component directory disabled");
            return result;
        }
        let directory = &options.directory;

        let matcher = match options.matcher(kind, self.materializer.extensions()) {
            Ok(matcher) => matcher,
            Err(e) => {
                result.errors.push(format!("{}: {e}", directory.display()));
                return result;
            }
        };

        let mut files = match discover(directory, &matcher).await {
            Ok(Discovery::Found(files)) => files,
            Ok(Discovery::Missing) => {
                warn!(
                    kind = %kind,
                    path = %directory.display(),
                    "Component directory does not exist, no {} loaded",
                    kind.plural()
                );
                result.missing = true;
                return result;
            }
            Err(e) => {
                result.errors.push(e.to_string());
                return result;
            }
        };
        files.sort_by(|a, b| a.path.cmp(&b.path));

        for file in files.into_iter().filter(|f| f.kind == kind) {
            match self.load_file(&file.path, kind).await {
                Ok(definition) => {
                    debug!(kind = %kind, id = definition.id(), path = %file.path.display(), "Loaded component");
                    result.components.push(LoadedComponent {
                        source: file.path,
                        definition,
                    });
                }
                Err(e) => {
                    warn!(kind = %kind, path = %file.path.display(), "Failed to load component: {}", e);
                    result.errors.push(format_file_error(directory, &file.path, &e));
                }
            }
        }

        info!(
            kind = %kind,
            path = %directory.display(),
            count = result.components.len(),
            errors = result.errors.len(),
            "Loaded {}",
            kind.plural()
        );
        result
    }

    /// Materialize, load and validate a single source file
    pub async fn load_file(&self, source: &Path, kind: ComponentKind) -> Result<ComponentDefinition> {
        let artifact = self.materializer.materialize(source).await?;
        let candidate = self
            .loader
            .load_candidate(&artifact.artifact_path)
            .await?
            .ok_or_else(|| Error::validation(source, kind))?;

        ComponentDefinition::from_object(kind, &candidate).ok_or_else(|| Error::validation(source, kind))
    }
}

fn format_file_error(directory: &Path, path: &Path, error: &Error) -> String {
    let shown = path.strip_prefix(directory).unwrap_or(path);
    format!("{}: {error}", shown.display())
}
