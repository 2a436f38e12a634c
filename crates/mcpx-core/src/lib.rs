//! mcpx core - Component Discovery, On-Demand Compilation and Registry
//!
//! Scans a project for tools, resources and prompts, compiles each source
//! into a private staging tree only when stale, loads the result through a
//! pluggable module runtime and publishes validated components into a
//! queryable [`Registry`].
//!
//! # Modules
//!
//! - **components** - discovery, structural contracts, loading and the registry
//! - **build** - compiler collaborators, the compilation cache and module resolution
//! - **config** - project configuration (`mcpx.toml`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mcpx_core::{ModuleRuntime, ProjectConfig, Registry};
//!
//! async fn example(runtime: Arc<dyn ModuleRuntime>) -> mcpx_core::Result<()> {
//!     let config = ProjectConfig::load(".")?;
//!     let registry = Registry::from_config(&config, runtime)?;
//!
//!     let report = registry.load_all(&config.directories()).await;
//!     for error in &report.errors {
//!         eprintln!("{error}");
//!     }
//!
//!     if let Some(tool) = registry.get_tool("math").await {
//!         let sum = tool.execute(serde_json::json!({"a": 2, "b": 3})).await?;
//!         println!("{sum}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod components;
pub mod config;
pub mod utils;

mod error;

#[cfg(test)]
mod testing;

pub use build::{
    CachePolicy, CommandCompiler, Compiler, DualRootResolver, MaterializedArtifact, Materializer,
    ModuleResolver, PassthroughCompiler, Resolution,
};
pub use components::{
    ComponentDefinition, ComponentKind, DirectoryLoader, DynamicLoader, ItemLoader, LoadOutcome,
    LoadReport, McpCatalog, ModuleRuntime, Object, PromptDefinition, Registry, RegistryItem,
    RegistryStats, ResourceDefinition, ToolDefinition, Value,
};
pub use config::{
    CompilerConfig, ComponentDirectories, ConfigValidationError, DirectoryOptions, ProjectConfig,
};
pub use error::{Error, Result};
