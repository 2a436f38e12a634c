//! Core Error Types
//!
//! Defines the error taxonomy for discovery, materialization, loading and
//! registry lookups.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::components::ComponentKind;

/// Core result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Source could not be translated by the compiler
    #[error("compilation failed for {}: {message}", path.display())]
    Compilation { path: PathBuf, message: String },

    /// A relative import could not be located on disk
    #[error("cannot resolve '{specifier}' from {}", from.display())]
    DependencyResolution { specifier: String, from: PathBuf },

    /// Artifact execution failed
    #[error("failed to load module {}: {message}", path.display())]
    ModuleLoad { path: PathBuf, message: String },

    /// Loaded value matched no component contract
    #[error("{} does not export a valid {kind}", path.display())]
    Validation { path: PathBuf, kind: ComponentKind },

    /// Registry lookup or lazy load miss
    #[error("{kind} not found: {id}")]
    NotFound { kind: ComponentKind, id: String },

    /// A component directory could not be scanned
    #[error("cannot scan directory {}: {source}", path.display())]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a compilation error
    pub fn compilation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Compilation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a dependency resolution error
    pub fn dependency(specifier: impl Into<String>, from: &Path) -> Self {
        Self::DependencyResolution {
            specifier: specifier.into(),
            from: from.to_path_buf(),
        }
    }

    /// Create a module load error
    pub fn module_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModuleLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a validation failure
    pub fn validation(path: impl Into<PathBuf>, kind: ComponentKind) -> Self {
        Self::Validation {
            path: path.into(),
            kind,
        }
    }

    /// Create a not found error
    pub fn not_found(kind: ComponentKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the compiler
    pub fn is_compilation(&self) -> bool {
        matches!(self, Self::Compilation { .. })
    }

    /// Check if this error is an unresolved import
    pub fn is_dependency_resolution(&self) -> bool {
        matches!(self, Self::DependencyResolution { .. })
    }

    /// Check if this error is a per-file failure that a directory load absorbs
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::Compilation { .. }
                | Self::DependencyResolution { .. }
                | Self::ModuleLoad { .. }
                | Self::Validation { .. }
        )
    }
}
