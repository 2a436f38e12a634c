//! Project Configuration
//!
//! Configuration is loaded with precedence:
//! 1. Environment variables (MCPX_*)
//! 2. Project file (`<project>/mcpx.toml`)
//! 3. Default values

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::build::{CachePolicy, Materializer, compiler_from_config, imports::normalize};
use crate::components::{ComponentKind, FileMatcher};
use crate::components::discovery::DEFAULT_EXTENSIONS;
use crate::error::Result;
use crate::utils::short_hash;

/// Project configuration file name
pub const CONFIG_FILE: &str = "mcpx.toml";

/// Environment override for the staging directory
pub const STAGING_DIR_ENV: &str = "MCPX_STAGING_DIR";

/// Configuration problems found by [`ProjectConfig::validate`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("at least one source extension is required")]
    NoExtensions,

    #[error("extension '{0}' must not start with a dot")]
    DottedExtension(String),

    #[error("staging directory {} is inside the project root", .0.display())]
    StagingInsideProject(PathBuf),

    #[error("invalid {kind} pattern '{pattern}': {message}")]
    InvalidPattern {
        kind: ComponentKind,
        pattern: String,
        message: String,
    },

    #[error("cannot read {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("cannot parse {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

/// Where one component kind is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryOptions {
    /// Load this kind at all
    pub enabled: bool,
    /// Directory to scan; relative paths resolve against the project root
    pub directory: PathBuf,
    /// File-name regex replacing the default base-name match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::new(),
            pattern: None,
        }
    }
}

impl DirectoryOptions {
    /// Enabled options scanning `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Conventional location for `kind`: `src/<plural>`
    pub fn for_kind(kind: ComponentKind) -> Self {
        Self::new(Path::new("src").join(kind.plural()))
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// File matcher for `kind` honoring the configured pattern
    pub fn matcher(&self, kind: ComponentKind, extensions: &[String]) -> Result<FileMatcher> {
        let matcher = FileMatcher::new(extensions.to_vec());
        match &self.pattern {
            Some(pattern) => {
                let regex = compile_pattern(kind, pattern)?;
                Ok(matcher.with_pattern(regex, kind))
            }
            None => Ok(matcher),
        }
    }
}

/// The three directory settings `Registry::load_all` consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDirectories {
    pub tools: DirectoryOptions,
    pub resources: DirectoryOptions,
    pub prompts: DirectoryOptions,
}

impl ComponentDirectories {
    pub fn get(&self, kind: ComponentKind) -> &DirectoryOptions {
        match kind {
            ComponentKind::Tool => &self.tools,
            ComponentKind::Resource => &self.resources,
            ComponentKind::Prompt => &self.prompts,
        }
    }
}

/// External compiler command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Program reading source on stdin and writing executable text to stdout;
    /// unset or blank means sources are already executable
    pub command: Option<String>,
    /// Arguments; `{file}` is replaced by the source path
    pub args: Vec<String>,
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root; never written to
    #[serde(skip)]
    pub project_root: PathBuf,

    /// Staging directory override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// Accepted source extensions, in resolution priority order
    pub extensions: Vec<String>,

    /// Staleness policy
    pub cache_policy: CachePolicy,

    pub tools: DirectoryOptions,
    pub resources: DirectoryOptions,
    pub prompts: DirectoryOptions,

    pub compiler: CompilerConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ProjectConfig {
    /// Defaults for a project rooted at `project_root`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            staging_dir: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            cache_policy: CachePolicy::default(),
            tools: DirectoryOptions::for_kind(ComponentKind::Tool),
            resources: DirectoryOptions::for_kind(ComponentKind::Resource),
            prompts: DirectoryOptions::for_kind(ComponentKind::Prompt),
            compiler: CompilerConfig::default(),
        }
    }

    /// Load `mcpx.toml` from `project_root` if present, then apply
    /// environment overrides
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self> {
        let project_root = absolute(project_root.as_ref())?;
        let path = project_root.join(CONFIG_FILE);

        let mut config = if path.is_file() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| ConfigValidationError::Unreadable {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            toml::from_str::<Self>(&content).map_err(|e| ConfigValidationError::Malformed {
                path: path.clone(),
                message: e.message().to_string(),
            })?
        } else {
            Self::default()
        };

        config.project_root = project_root;
        for kind in ComponentKind::ALL {
            let options = config.options_mut(kind);
            if options.directory.as_os_str().is_empty() {
                options.directory = DirectoryOptions::for_kind(kind).directory;
            }
        }
        if let Some(dir) = std::env::var_os(STAGING_DIR_ENV).filter(|v| !v.is_empty()) {
            config.staging_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn with_extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_directory(mut self, kind: ComponentKind, options: DirectoryOptions) -> Self {
        *self.options_mut(kind) = options;
        self
    }

    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// Raw options for `kind` as configured
    pub fn options(&self, kind: ComponentKind) -> &DirectoryOptions {
        match kind {
            ComponentKind::Tool => &self.tools,
            ComponentKind::Resource => &self.resources,
            ComponentKind::Prompt => &self.prompts,
        }
    }

    fn options_mut(&mut self, kind: ComponentKind) -> &mut DirectoryOptions {
        match kind {
            ComponentKind::Tool => &mut self.tools,
            ComponentKind::Resource => &mut self.resources,
            ComponentKind::Prompt => &mut self.prompts,
        }
    }

    /// Project root made absolute against the working directory
    pub fn root(&self) -> PathBuf {
        absolute(&self.project_root).unwrap_or_else(|_| normalize(&self.project_root))
    }

    /// Absolute directory scanned for `kind`; `None` when unset
    pub fn directory(&self, kind: ComponentKind) -> Option<PathBuf> {
        let dir = &self.options(kind).directory;
        if dir.as_os_str().is_empty() {
            None
        } else {
            Some(normalize(&self.root().join(dir)))
        }
    }

    /// Directory options with directories resolved against the project root
    pub fn directories(&self) -> ComponentDirectories {
        let resolved = |kind: ComponentKind| {
            let mut options = self.options(kind).clone();
            if let Some(dir) = self.directory(kind) {
                options.directory = dir;
            }
            options
        };
        ComponentDirectories {
            tools: resolved(ComponentKind::Tool),
            resources: resolved(ComponentKind::Resource),
            prompts: resolved(ComponentKind::Prompt),
        }
    }

    /// Effective staging directory
    ///
    /// Defaults to a per-project directory under the user cache directory so
    /// artifacts never land in the source tree.
    pub fn staging_dir(&self) -> PathBuf {
        match &self.staging_dir {
            Some(dir) => normalize(&self.root().join(dir)),
            None => {
                let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
                let key = short_hash(self.root().to_string_lossy().as_bytes());
                base.join("mcpx").join("staging").join(key)
            }
        }
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.extensions.is_empty() {
            return Err(ConfigValidationError::NoExtensions);
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(ConfigValidationError::DottedExtension(ext.clone()));
        }

        let staging = self.staging_dir();
        if staging.starts_with(self.root()) {
            return Err(ConfigValidationError::StagingInsideProject(staging));
        }

        for kind in ComponentKind::ALL {
            if let Some(pattern) = &self.options(kind).pattern {
                Regex::new(pattern).map_err(|e| ConfigValidationError::InvalidPattern {
                    kind,
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        Ok(())
    }

    /// Materializer wired with this project's compiler, staging and policy
    pub fn materializer(&self) -> Materializer {
        Materializer::new(
            self.root(),
            self.staging_dir(),
            compiler_from_config(&self.compiler),
        )
        .with_extensions(self.extensions.clone())
        .with_policy(self.cache_policy)
    }
}

fn compile_pattern(kind: ComponentKind, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        ConfigValidationError::InvalidPattern {
            kind,
            pattern: pattern.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}
