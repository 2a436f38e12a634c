//! Module Resolution
//!
//! Artifacts live in the staging tree but their library dependencies are
//! installed in the project. Resolution therefore uses two roots: relative
//! specifiers resolve next to the artifact inside staging, everything else
//! resolves from the original project root.

use std::path::{Path, PathBuf};

use super::imports::{is_relative, normalize};
use crate::error::{Error, Result};

/// Extension compiled artifacts carry
pub const ARTIFACT_EXTENSION: &str = "js";

/// Runtime modules that resolve without touching the filesystem
const BUILTIN_MODULES: [&str; 16] = [
    "assert",
    "buffer",
    "child_process",
    "crypto",
    "events",
    "fs",
    "http",
    "https",
    "net",
    "os",
    "path",
    "process",
    "stream",
    "url",
    "util",
    "zlib",
];

/// Where a specifier resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A compiled sibling inside the staging tree
    Staged(PathBuf),
    /// A library installed under the project root
    Project(PathBuf),
    /// A module provided by the runtime itself
    Builtin(String),
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Staged(p) | Self::Project(p) => Some(p),
            Self::Builtin(_) => None,
        }
    }
}

/// Resolves import specifiers for a loading module
pub trait ModuleResolver: Send + Sync {
    /// Resolve `specifier` as imported from a module in `context_dir`
    fn resolve(&self, specifier: &str, context_dir: &Path) -> Result<Resolution>;
}

/// Resolves relative specifiers against compiled artifacts in staging
#[derive(Debug, Clone)]
pub struct StagingResolver {
    root: PathBuf,
}

impl StagingResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModuleResolver for StagingResolver {
    fn resolve(&self, specifier: &str, context_dir: &Path) -> Result<Resolution> {
        let base = normalize(&context_dir.join(specifier));
        if !base.starts_with(&self.root) {
            return Err(Error::dependency(specifier, context_dir));
        }

        let mut candidates = vec![base.clone(), base.with_extension(ARTIFACT_EXTENSION)];
        let mut appended = base.clone().into_os_string();
        appended.push(".");
        appended.push(ARTIFACT_EXTENSION);
        candidates.push(PathBuf::from(appended));
        candidates.push(base.join(format!("index.{ARTIFACT_EXTENSION}")));

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(Resolution::Staged)
            .ok_or_else(|| Error::dependency(specifier, context_dir))
    }
}

/// Resolves library specifiers the way the project itself would: through
/// `node_modules` directories from the project root upwards
#[derive(Debug, Clone)]
pub struct ProjectRootResolver {
    root: PathBuf,
}

impl ProjectRootResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModuleResolver for ProjectRootResolver {
    fn resolve(&self, specifier: &str, _context_dir: &Path) -> Result<Resolution> {
        if let Some(name) = specifier.strip_prefix("node:") {
            return Ok(Resolution::Builtin(name.to_string()));
        }

        let package = package_name(specifier);
        if BUILTIN_MODULES.contains(&package) {
            return Ok(Resolution::Builtin(specifier.to_string()));
        }

        let path = Path::new(specifier);
        if path.is_absolute() {
            return if path.exists() {
                Ok(Resolution::Project(path.to_path_buf()))
            } else {
                Err(Error::dependency(specifier, &self.root))
            };
        }

        self.root
            .ancestors()
            .map(|dir| dir.join("node_modules"))
            .find(|modules| modules.join(package).exists())
            .map(|modules| Resolution::Project(modules.join(specifier)))
            .ok_or_else(|| Error::dependency(specifier, &self.root))
    }
}

/// Package portion of a bare specifier (`@scope/pkg/sub` → `@scope/pkg`)
fn package_name(specifier: &str) -> &str {
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next().unwrap_or(specifier);
    match (first.starts_with('@'), parts.next()) {
        (true, Some(second)) => &specifier[..first.len() + 1 + second.len()],
        _ => first,
    }
}

/// Picks the staging strategy for relative specifiers and the project-root
/// strategy for everything else
#[derive(Debug, Clone)]
pub struct DualRootResolver {
    staging: StagingResolver,
    project: ProjectRootResolver,
}

impl DualRootResolver {
    pub fn new(staging_root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            staging: StagingResolver::new(staging_root),
            project: ProjectRootResolver::new(project_root),
        }
    }

    pub fn staging_root(&self) -> &Path {
        self.staging.root()
    }

    pub fn project_root(&self) -> &Path {
        self.project.root()
    }
}

impl ModuleResolver for DualRootResolver {
    fn resolve(&self, specifier: &str, context_dir: &Path) -> Result<Resolution> {
        if is_relative(specifier) {
            self.staging.resolve(specifier, context_dir)
        } else {
            self.project.resolve(specifier, context_dir)
        }
    }
}
