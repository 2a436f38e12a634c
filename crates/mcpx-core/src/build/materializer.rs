//! Compilation Cache & Module Materializer
//!
//! Compiles a component source into the staging tree only when its artifact
//! is stale, and stages every same-project relative dependency alongside it
//! so that compiled siblings resolve from the artifact's own directory.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::compiler::Compiler;
use super::imports::{normalize, relative_imports, resolve_source_import};
use super::resolver::{ARTIFACT_EXTENSION, DualRootResolver};
use crate::components::discovery::DEFAULT_EXTENSIONS;
use crate::error::{Error, Result};
use crate::utils::{content_hash, short_hash};

/// Staging subdirectory for sources that live outside the project root
const EXTERNAL_DIR: &str = "_external";

/// Sidecar suffix holding the source hash under [`CachePolicy::ContentHash`]
const HASH_SUFFIX: &str = "sha256";

/// How staleness is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Artifact is fresh when it is not older than its source
    #[default]
    Mtime,
    /// Artifact is fresh when the source hash matches the one it was built from
    ContentHash,
}

/// A staged, executable artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedArtifact {
    /// Source the artifact was built from
    pub source_path: PathBuf,
    /// Location in the staging tree
    pub artifact_path: PathBuf,
    /// Artifact modification time
    pub artifact_modified_at: SystemTime,
    /// Staged artifacts of the source's relative imports
    pub dependencies: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fingerprint {
    Modified(SystemTime),
    Hash(String),
}

/// Cache table entry, keyed by source path
#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: Fingerprint,
    artifact_path: PathBuf,
    dependencies: Vec<PathBuf>,
}

type MaterializeFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

/// Compile-if-stale front end over a [`Compiler`]
pub struct Materializer {
    project_root: PathBuf,
    staging_dir: PathBuf,
    extensions: Vec<String>,
    policy: CachePolicy,
    compiler: Arc<dyn Compiler>,
    cache: RwLock<HashMap<PathBuf, CacheEntry>>,
    // Serializes builds so concurrent kind loads never write the same artifact
    build_lock: Mutex<()>,
    compilations: AtomicUsize,
}

impl Materializer {
    /// Create a materializer staging `project_root` sources under `staging_dir`
    pub fn new(
        project_root: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
        compiler: Arc<dyn Compiler>,
    ) -> Self {
        Self {
            project_root: normalize(&project_root.into()),
            staging_dir: normalize(&staging_dir.into()),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            policy: CachePolicy::default(),
            compiler,
            cache: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Set the accepted source extensions, in resolution order
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the staleness policy
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Resolver for artifacts produced by this materializer
    pub fn resolver(&self) -> DualRootResolver {
        DualRootResolver::new(&self.staging_dir, &self.project_root)
    }

    /// Number of compiler invocations so far
    pub fn compile_count(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of sources in the cache table
    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Deterministic staging location for `source`
    pub fn artifact_path_for(&self, source: &Path) -> PathBuf {
        self.staged_location(source).with_extension(ARTIFACT_EXTENSION)
    }

    /// True when `path` carries one of the accepted source extensions
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|accepted| accepted == ext))
    }

    /// Mirror of `source` inside staging, file name unchanged
    fn staged_location(&self, source: &Path) -> PathBuf {
        let source = self.absolute(source);
        match source.strip_prefix(&self.project_root) {
            Ok(relative) => self.staging_dir.join(relative),
            Err(_) => {
                let parent = source.parent().unwrap_or(Path::new("/"));
                let file_name = source.file_name().unwrap_or_default();
                self.staging_dir
                    .join(EXTERNAL_DIR)
                    .join(short_hash(parent.to_string_lossy().as_bytes()))
                    .join(file_name)
            }
        }
    }

    /// Compile `source` if stale and stage it together with its relative
    /// dependencies
    pub async fn materialize(&self, source: &Path) -> Result<MaterializedArtifact> {
        let source = self.absolute(source);
        let _guard = self.build_lock.lock().await;

        let mut visiting = HashSet::new();
        let artifact_path = self.materialize_file(source.clone(), &mut visiting).await?;
        let artifact_modified_at = fs::metadata(&artifact_path).await?.modified()?;
        let dependencies = self
            .cache
            .read()
            .await
            .get(&source)
            .map(|entry| entry.dependencies.clone())
            .unwrap_or_default();

        Ok(MaterializedArtifact {
            source_path: source,
            artifact_path,
            artifact_modified_at,
            dependencies,
        })
    }

    /// Remove the staging tree and forget every cache entry
    pub async fn clean(&self) -> Result<()> {
        let _guard = self.build_lock.lock().await;
        match fs::remove_dir_all(&self.staging_dir).await {
            Ok(()) => info!(path = %self.staging_dir.display(), "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.cache.write().await.clear();
        Ok(())
    }

    fn materialize_file<'a>(
        &'a self,
        source: PathBuf,
        visiting: &'a mut HashSet<PathBuf>,
    ) -> MaterializeFuture<'a> {
        Box::pin(async move {
            let artifact_path = self.artifact_path_for(&source);

            // Already on the current build path: an import cycle, or a
            // dependency shared by two siblings that was staged moments ago.
            if !visiting.insert(source.clone()) {
                debug!(path = %source.display(), "Skipping source already visited in this build");
                return Ok(artifact_path);
            }

            let text = fs::read_to_string(&source).await?;
            let fingerprint = match self.policy {
                CachePolicy::Mtime => {
                    Fingerprint::Modified(fs::metadata(&source).await?.modified()?)
                }
                CachePolicy::ContentHash => Fingerprint::Hash(content_hash(&text)),
            };

            let compiled = if self.is_fresh(&source, &artifact_path, &fingerprint).await {
                debug!(path = %source.display(), "Artifact is fresh");
                None
            } else {
                let output = self
                    .compiler
                    .compile(&text, &source)
                    .await
                    .map_err(|e| Error::compilation(&source, format!("{e:#}")))?;
                self.compilations.fetch_add(1, Ordering::Relaxed);
                Some(output)
            };

            let source_dir = source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.project_root.clone());

            let mut dependencies = Vec::new();
            for specifier in relative_imports(&text) {
                let dependency = resolve_source_import(&specifier, &source_dir, &self.extensions)
                    .filter(|dep| dep.starts_with(&self.project_root))
                    .ok_or_else(|| Error::dependency(&specifier, &source))?;
                let staged = if self.is_source(&dependency) {
                    self.materialize_file(dependency, &mut *visiting).await?
                } else {
                    self.stage_asset(&dependency).await?
                };
                dependencies.push(staged);
            }

            if let Some(output) = compiled {
                if let Some(parent) = artifact_path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&artifact_path, output).await?;
                if let Fingerprint::Hash(hash) = &fingerprint {
                    fs::write(hash_sidecar(&artifact_path), hash).await?;
                }
                info!(
                    source = %source.display(),
                    artifact = %artifact_path.display(),
                    "Compiled component source"
                );
            }

            self.cache.write().await.insert(
                source,
                CacheEntry {
                    fingerprint,
                    artifact_path: artifact_path.clone(),
                    dependencies,
                },
            );

            Ok(artifact_path)
        })
    }

    /// Copy a non-source dependency (`./data.json`) into staging unchanged,
    /// under its own name, so it resolves as written next to the artifact
    async fn stage_asset(&self, source: &Path) -> Result<PathBuf> {
        let staged = self.staged_location(source);
        let source_modified = fs::metadata(source).await?.modified()?;
        let fresh = fs::metadata(&staged)
            .await
            .and_then(|meta| meta.modified())
            .is_ok_and(|modified| modified >= source_modified);

        if !fresh {
            if let Some(parent) = staged.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(source, &staged).await?;
            debug!(source = %source.display(), staged = %staged.display(), "Staged asset");
        }
        Ok(staged)
    }

    async fn is_fresh(&self, source: &Path, artifact: &Path, fingerprint: &Fingerprint) -> bool {
        let Ok(artifact_meta) = fs::metadata(artifact).await else {
            return false;
        };

        match fingerprint {
            Fingerprint::Modified(source_modified) => artifact_meta
                .modified()
                .is_ok_and(|artifact_modified| artifact_modified >= *source_modified),
            Fingerprint::Hash(hash) => {
                let cached = self.cache.read().await.get(source).cloned();
                if let Some(entry) = cached {
                    if entry.artifact_path == artifact {
                        return entry.fingerprint == *fingerprint;
                    }
                }
                fs::read_to_string(hash_sidecar(artifact))
                    .await
                    .is_ok_and(|stored| stored.trim() == hash)
            }
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.project_root.join(path))
        }
    }
}

fn hash_sidecar(artifact: &Path) -> PathBuf {
    let mut path = artifact.to_path_buf().into_os_string();
    path.push(".");
    path.push(HASH_SUFFIX);
    PathBuf::from(path)
}
