//! Component Registry
//!
//! In-memory store of validated components keyed by `(kind, id)`. A registry
//! is loaded once from the three component directories; reloading requires
//! an explicit [`Registry::clear`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::directory::{DirectoryLoadResult, DirectoryLoader};
use super::loader::{DynamicLoader, ModuleRuntime};
use super::mcp_adapter::McpCatalog;
use super::types::{
    ComponentDefinition, ComponentKind, PromptDefinition, ResourceDefinition, ToolDefinition,
};
use crate::config::{ComponentDirectories, ProjectConfig};
use crate::error::{Error, Result};

/// Produces a single component on demand for [`Registry::get`]
#[async_trait]
pub trait ItemLoader: Send + Sync {
    /// Load the `kind` component identified by `id`; `None` when it does not
    /// exist
    async fn load_item(
        &self,
        kind: ComponentKind,
        id: &str,
    ) -> anyhow::Result<Option<ComponentDefinition>>;
}

/// Item loader that searches the configured directory of the requested kind
pub struct DirectoryItemLoader {
    loader: DirectoryLoader,
    directories: ComponentDirectories,
}

impl DirectoryItemLoader {
    pub fn new(loader: DirectoryLoader, directories: ComponentDirectories) -> Self {
        Self {
            loader,
            directories,
        }
    }
}

#[async_trait]
impl ItemLoader for DirectoryItemLoader {
    async fn load_item(
        &self,
        kind: ComponentKind,
        id: &str,
    ) -> anyhow::Result<Option<ComponentDefinition>> {
        let result = self
            .loader
            .load_directory(self.directories.get(kind), kind)
            .await;
        Ok(result
            .components
            .into_iter()
            .rev()
            .map(|c| c.definition)
            .find(|d| d.id() == id))
    }
}

/// A stored component
#[derive(Debug, Clone)]
pub struct RegistryItem {
    pub id: String,
    pub kind: ComponentKind,
    pub component: ComponentDefinition,
    /// Source file, absent for items produced by an [`ItemLoader`]
    pub source: Option<PathBuf>,
}

impl RegistryItem {
    pub fn new(component: ComponentDefinition, source: Option<PathBuf>) -> Self {
        Self {
            id: component.id().to_string(),
            kind: component.kind(),
            component,
            source,
        }
    }

    /// Storage key, `kind:id`
    pub fn key(&self) -> String {
        item_key(self.kind, &self.id)
    }
}

fn item_key(kind: ComponentKind, id: &str) -> String {
    format!("{kind}:{id}")
}

/// Per-kind counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub tools: usize,
    pub resources: usize,
    pub prompts: usize,
    pub total: usize,
}

impl RegistryStats {
    fn count<'a>(items: impl Iterator<Item = &'a RegistryItem>) -> Self {
        let mut stats = Self::default();
        for item in items {
            match item.kind {
                ComponentKind::Tool => stats.tools += 1,
                ComponentKind::Resource => stats.resources += 1,
                ComponentKind::Prompt => stats.prompts += 1,
            }
            stats.total += 1;
        }
        stats
    }
}

/// Whether `load_all` did any work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded,
    /// The registry was loaded before; nothing changed
    AlreadyLoaded,
}

/// A per-file or per-directory failure recorded during `load_all`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadError {
    pub kind: ComponentKind,
    pub message: String,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Summary of a `load_all` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub outcome: LoadOutcome,
    pub stats: RegistryStats,
    pub errors: Vec<LoadError>,
    /// Kinds whose configured directory does not exist
    pub missing_directories: Vec<ComponentKind>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Default)]
struct RegistryState {
    items: HashMap<String, RegistryItem>,
    loaded_at: Option<DateTime<Utc>>,
}

/// Component registry
pub struct Registry {
    loader: DirectoryLoader,
    item_loader: Option<Arc<dyn ItemLoader>>,
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Create an empty registry loading through `loader`
    pub fn new(loader: DirectoryLoader) -> Self {
        Self {
            loader,
            item_loader: None,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Build the full pipeline for a project: its materializer, a dual-root
    /// resolver and `runtime` for executing artifacts
    ///
    /// The lazy [`Registry::get`] path searches the configured directories.
    pub fn from_config(config: &ProjectConfig, runtime: Arc<dyn ModuleRuntime>) -> Result<Self> {
        config.validate()?;

        let materializer = Arc::new(config.materializer());
        let resolver = Arc::new(materializer.resolver());
        let loader = DirectoryLoader::new(materializer, DynamicLoader::new(runtime, resolver));
        let item_loader = DirectoryItemLoader::new(loader.clone(), config.directories());

        Ok(Self::new(loader).with_item_loader(Arc::new(item_loader)))
    }

    /// Attach the collaborator used by [`Registry::get`] on a miss
    pub fn with_item_loader(mut self, item_loader: Arc<dyn ItemLoader>) -> Self {
        self.item_loader = Some(item_loader);
        self
    }

    pub fn directory_loader(&self) -> &DirectoryLoader {
        &self.loader
    }

    /// Load every enabled component directory
    ///
    /// The three kinds load concurrently and storage is replaced in one step
    /// once all of them finish. Per-file failures are reported, never raised.
    pub async fn load_all(&self, directories: &ComponentDirectories) -> LoadReport {
        if let Some(report) = already_loaded(&*self.state.read().await) {
            return report;
        }

        info!("Loading components");
        let (tools, resources, prompts) = tokio::join!(
            self.loader
                .load_directory(&directories.tools, ComponentKind::Tool),
            self.loader
                .load_directory(&directories.resources, ComponentKind::Resource),
            self.loader
                .load_directory(&directories.prompts, ComponentKind::Prompt),
        );

        let mut items = HashMap::new();
        let mut errors = Vec::new();
        let mut missing_directories = Vec::new();

        for (kind, result) in [
            (ComponentKind::Tool, tools),
            (ComponentKind::Resource, resources),
            (ComponentKind::Prompt, prompts),
        ] {
            let DirectoryLoadResult {
                components,
                errors: kind_errors,
                missing,
            } = result;

            if missing {
                missing_directories.push(kind);
            }
            errors.extend(kind_errors.into_iter().map(|message| LoadError { kind, message }));

            for loaded in components {
                let item = RegistryItem::new(loaded.definition, Some(loaded.source));
                if let Some(previous) = items.insert(item.key(), item) {
                    warn!(
                        kind = %kind,
                        id = %previous.id,
                        replaced = ?previous.source,
                        "Duplicate component id, keeping the later file"
                    );
                }
            }
        }

        let mut state = self.state.write().await;
        // A concurrent load may have finished first
        if let Some(report) = already_loaded(&state) {
            return report;
        }

        let loaded_at = Utc::now();
        state.items = items;
        state.loaded_at = Some(loaded_at);
        let stats = RegistryStats::count(state.items.values());
        drop(state);

        if !errors.is_empty() {
            error!(count = errors.len(), "Some components failed to load");
            for e in &errors {
                error!("{}", e);
            }
        }
        info!(
            tools = stats.tools,
            resources = stats.resources,
            prompts = stats.prompts,
            "Registry loaded"
        );

        LoadReport {
            outcome: LoadOutcome::Loaded,
            stats,
            errors,
            missing_directories,
            loaded_at,
        }
    }

    /// Empty storage and allow `load_all` again
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.items.clear();
        state.loaded_at = None;
        debug!("Registry cleared");
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded_at.is_some()
    }

    /// Counts computed from current storage
    pub async fn stats(&self) -> RegistryStats {
        RegistryStats::count(self.state.read().await.items.values())
    }

    /// All items of `kind`, sorted by id
    pub async fn items(&self, kind: ComponentKind) -> Vec<RegistryItem> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    /// Tool items, sorted by name
    pub async fn get_all_tools(&self) -> Vec<RegistryItem> {
        self.items(ComponentKind::Tool).await
    }

    /// Resource items, sorted by URI
    pub async fn get_all_resources(&self) -> Vec<RegistryItem> {
        self.items(ComponentKind::Resource).await
    }

    /// Prompt items, sorted by name
    pub async fn get_all_prompts(&self) -> Vec<RegistryItem> {
        self.items(ComponentKind::Prompt).await
    }

    async fn lookup(&self, kind: ComponentKind, id: &str) -> Option<RegistryItem> {
        self.state.read().await.items.get(&item_key(kind, id)).cloned()
    }

    /// Tool by name
    pub async fn get_tool(&self, name: &str) -> Option<ToolDefinition> {
        self.lookup(ComponentKind::Tool, name)
            .await
            .and_then(|item| item.component.as_tool().cloned())
    }

    /// Resource by URI
    pub async fn get_resource(&self, uri: &str) -> Option<ResourceDefinition> {
        self.lookup(ComponentKind::Resource, uri)
            .await
            .and_then(|item| item.component.as_resource().cloned())
    }

    /// Prompt by name
    pub async fn get_prompt(&self, name: &str) -> Option<PromptDefinition> {
        self.lookup(ComponentKind::Prompt, name)
            .await
            .and_then(|item| item.component.as_prompt().cloned())
    }

    /// Item by kind and id, loading it through the item loader on a miss
    pub async fn get(&self, kind: ComponentKind, id: &str) -> Result<RegistryItem> {
        if let Some(item) = self.lookup(kind, id).await {
            return Ok(item);
        }

        let Some(item_loader) = &self.item_loader else {
            return Err(Error::not_found(kind, id));
        };

        let definition = match item_loader.load_item(kind, id).await {
            Ok(Some(definition)) if definition.kind() == kind && definition.id() == id => {
                definition
            }
            Ok(_) => return Err(Error::not_found(kind, id)),
            Err(e) => {
                warn!(kind = %kind, id = %id, "Item loader failed: {:#}", e);
                return Err(Error::not_found(kind, id));
            }
        };

        let item = RegistryItem::new(definition, None);
        let mut state = self.state.write().await;
        let item = state.items.entry(item.key()).or_insert(item).clone();
        debug!(kind = %kind, id = %id, "Loaded component on demand");
        Ok(item)
    }

    /// Execute the named tool
    pub async fn call_tool(&self, name: &str, args: JsonValue) -> Result<JsonValue> {
        let tool = self
            .get_tool(name)
            .await
            .ok_or_else(|| Error::not_found(ComponentKind::Tool, name))?;
        Ok(tool.execute(args).await?)
    }

    /// MCP descriptors for everything currently stored
    pub async fn describe(&self) -> McpCatalog {
        let state = self.state.read().await;
        McpCatalog::from_definitions(state.items.values().map(|item| &item.component))
    }
}

fn already_loaded(state: &RegistryState) -> Option<LoadReport> {
    let loaded_at = state.loaded_at?;
    warn!("Registry already loaded, call clear() before loading again");
    Some(LoadReport {
        outcome: LoadOutcome::AlreadyLoaded,
        stats: RegistryStats::count(state.items.values()),
        errors: Vec::new(),
        missing_directories: Vec::new(),
        loaded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValidationError;
    use crate::testing::{Project, ScriptRuntime, write_file};
    use serde_json::json;

    fn seed_example(project: &Project) {
        write_file(project.root(), "src/tools/math/tool.ts", "kind tool\nname math\n");
        write_file(
            project.root(),
            "src/resources/x/resource.ts",
            "kind resource\nname x\nuri resource://x\ncontent hello\n",
        );
        write_file(project.root(), "src/prompts/greet/prompt.ts", "kind prompt\nname greet\n");
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let project = Project::new();
        seed_example(&project);
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert_eq!(report.outcome, LoadOutcome::Loaded);
        assert!(!report.has_errors(), "{:?}", report.errors);
        assert_eq!(
            report.stats,
            RegistryStats {
                tools: 1,
                resources: 1,
                prompts: 1,
                total: 3
            }
        );
        assert_eq!(registry.stats().await, report.stats);

        let math = registry.get_tool("math").await.unwrap();
        assert_eq!(math.execute(json!({"a": 2, "b": 3})).await.unwrap(), json!(5));
        assert_eq!(
            registry.call_tool("math", json!({"a": 1, "b": 1})).await.unwrap(),
            json!(2)
        );

        let resource = registry.get_resource("resource://x").await.unwrap();
        assert_eq!(resource.read().await.unwrap(), "hello");

        let greet = registry.get_prompt("greet").await.unwrap();
        let messages = greet.messages(json!({"who": "Ada"})).await.unwrap();
        assert_eq!(messages[0].content["text"], "Hello Ada");

        let tools = registry.get_all_tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].kind, ComponentKind::Tool);
        assert_eq!(tools[0].key(), "tool:math");
        assert!(tools[0].component.as_tool().is_some());
        let resources = registry.get_all_resources().await;
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].id, "resource://x");
        let prompts = registry.get_all_prompts().await;
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].kind, ComponentKind::Prompt);

        let catalog = registry.describe().await;
        assert_eq!(catalog.tools[0].name, "math");
        assert_eq!(catalog.resources[0].uri, "resource://x");
        assert_eq!(catalog.prompts[0].name, "greet");
    }

    #[tokio::test]
    async fn test_missing_lookups_return_none() {
        let project = Project::new();
        seed_example(&project);
        let registry = project.registry();
        registry.load_all(&project.directories()).await;

        assert!(registry.get_tool("nope").await.is_none());
        assert!(registry.get_resource("resource://nope").await.is_none());
        assert!(registry.get_prompt("nope").await.is_none());
        // Identifiers are scoped by kind
        assert!(registry.get_tool("greet").await.is_none());

        let err = registry.call_tool("nope", json!({})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_all_is_idempotent_until_clear() {
        let project = Project::new();
        seed_example(&project);
        let registry = project.registry();

        let first = registry.load_all(&project.directories()).await;
        write_file(project.root(), "src/tools/search/tool.ts", "kind tool\nname search\n");

        let second = registry.load_all(&project.directories()).await;
        assert_eq!(second.outcome, LoadOutcome::AlreadyLoaded);
        assert_eq!(second.stats, first.stats);
        assert_eq!(second.loaded_at, first.loaded_at);
        assert!(registry.get_tool("search").await.is_none());

        registry.clear().await;
        assert!(!registry.is_loaded().await);
        assert_eq!(registry.stats().await.total, 0);

        let third = registry.load_all(&project.directories()).await;
        assert_eq!(third.outcome, LoadOutcome::Loaded);
        assert_eq!(third.stats.tools, 2);
    }

    #[tokio::test]
    async fn test_broken_component_is_isolated() {
        let project = Project::new();
        seed_example(&project);
        write_file(project.root(), "src/tools/search/tool.ts", "kind tool\nname search\n");
        write_file(project.root(), "src/tools/broken/tool.ts", "SYNTAX ERROR\n");
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert_eq!(report.stats.tools, 2);
        assert_eq!(report.stats.total, 4);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ComponentKind::Tool);
        assert!(report.errors[0].message.contains("broken"));
    }

    #[tokio::test]
    async fn test_missing_directories_are_not_errors() {
        let project = Project::new();
        write_file(project.root(), "src/tools/math/tool.ts", "kind tool\nname math\n");
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert!(!report.has_errors());
        assert_eq!(report.stats.total, 1);
        assert_eq!(
            report.missing_directories,
            vec![ComponentKind::Resource, ComponentKind::Prompt]
        );
    }

    #[tokio::test]
    async fn test_dual_root_resolution() {
        let project = Project::new();
        std::fs::create_dir_all(project.root().join("node_modules/zod")).unwrap();
        write_file(
            project.root(),
            "src/tools/math/tool.ts",
            "import { z } from 'zod';\nimport { double } from './utils.ts';\nkind tool\nname math\n",
        );
        write_file(project.root(), "src/tools/math/utils.ts", "export fn double\n");
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert!(!report.has_errors(), "{:?}", report.errors);
        assert_eq!(report.stats.tools, 1);
        assert!(project.staging().join("src/tools/math/utils.js").is_file());
        assert!(!project.root().join("src/tools/math/utils.js").exists());
    }

    #[tokio::test]
    async fn test_unresolvable_library_fails_only_that_file() {
        let project = Project::new();
        write_file(
            project.root(),
            "src/tools/math/tool.ts",
            "import { z } from 'zod';\nkind tool\nname math\n",
        );
        write_file(project.root(), "src/tools/echo/tool.ts", "kind tool\nname echo\n");
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert_eq!(report.stats.tools, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("zod"));
    }

    #[tokio::test]
    async fn test_from_config() {
        let project = Project::new();
        seed_example(&project);
        let config = project.config();

        let registry = Registry::from_config(&config, Arc::new(ScriptRuntime)).unwrap();
        let report = registry.load_all(&config.directories()).await;
        assert!(!report.has_errors(), "{:?}", report.errors);
        assert_eq!(report.stats.total, 3);
        assert!(project.staging().join("src/tools/math/tool.js").is_file());

        // Item loader is wired for lazy lookups
        registry.clear().await;
        let item = registry.get(ComponentKind::Tool, "math").await.unwrap();
        assert_eq!(item.key(), "tool:math");
    }

    #[test]
    fn test_from_config_relative_root() {
        let config = ProjectConfig::new(".");
        assert!(Registry::from_config(&config, Arc::new(ScriptRuntime)).is_ok());

        let inside = ProjectConfig::new(".").with_staging_dir("staging");
        assert!(matches!(
            Registry::from_config(&inside, Arc::new(ScriptRuntime)),
            Err(Error::Config(ConfigValidationError::StagingInsideProject(_)))
        ));
    }

    #[tokio::test]
    async fn test_authoring_forms() {
        let project = Project::new();
        write_file(project.root(), "src/tools/a/tool.ts", "kind tool\nname a\nform class\n");
        write_file(project.root(), "src/tools/b/tool.ts", "kind tool\nname b\nform instance\n");
        write_file(project.root(), "src/tools/c/tool.ts", "kind tool\nname c\nform default\n");
        write_file(project.root(), "src/tools/d/tool.ts", "kind tool\nname d\nform legacy\n");
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert!(!report.has_errors(), "{:?}", report.errors);
        let names: Vec<_> = registry
            .get_all_tools()
            .await
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_keeps_later_file() {
        let project = Project::new();
        write_file(
            project.root(),
            "src/tools/a/tool.ts",
            "kind tool\nname math\ndescription first\n",
        );
        write_file(
            project.root(),
            "src/tools/b/tool.ts",
            "kind tool\nname math\ndescription second\n",
        );
        let registry = project.registry();

        let report = registry.load_all(&project.directories()).await;
        assert_eq!(report.stats.tools, 1);
        let tool = registry.get_tool("math").await.unwrap();
        assert_eq!(tool.description.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_lazy_get() {
        let project = Project::new();
        seed_example(&project);
        let registry = project.registry();

        let item = registry.get(ComponentKind::Prompt, "greet").await.unwrap();
        assert_eq!(item.id, "greet");
        assert_eq!(item.kind, ComponentKind::Prompt);
        assert!(item.source.is_none());

        // Cached without marking the registry loaded
        assert_eq!(registry.stats().await.prompts, 1);
        assert!(!registry.is_loaded().await);

        let err = registry.get(ComponentKind::Tool, "absent").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_without_item_loader() {
        let project = Project::new();
        seed_example(&project);
        let registry = Registry::new(project.directory_loader());

        let err = registry.get(ComponentKind::Tool, "math").await.unwrap_err();
        assert!(err.is_not_found());

        registry.load_all(&project.directories()).await;
        let item = registry.get(ComponentKind::Tool, "math").await.unwrap();
        assert!(item.source.unwrap().ends_with("src/tools/math/tool.ts"));
    }
}
