//! Component discovery, loading and registry
//!
//! Tools, resources and prompts are authored as source files named
//! `tool.<ext>`, `resource.<ext>` or `prompt.<ext>`. Each file is
//! materialized, executed, checked against its structural contract and
//! published into a [`Registry`].

pub mod directory;
pub mod discovery;
pub mod loader;
pub mod mcp_adapter;
pub mod registry;
pub mod types;
pub mod validate;
pub mod value;

pub use directory::{DirectoryLoadResult, DirectoryLoader, LoadedComponent};
pub use discovery::{ComponentSourceFile, Discovery, FileMatcher, discover};
pub use loader::{DynamicLoader, ModuleRuntime, normalize_export};
pub use mcp_adapter::{McpCatalog, McpPrompt, McpResource, McpTool};
pub use registry::{
    DirectoryItemLoader, ItemLoader, LoadError, LoadOutcome, LoadReport, Registry, RegistryItem,
    RegistryStats,
};
pub use types::{
    ComponentDefinition, ComponentKind, PromptArgument, PromptDefinition, PromptMessage,
    ResourceContent, ResourceDefinition, ToolDefinition,
};
pub use validate::{matching_kinds, validate_prompt, validate_resource, validate_tool};
pub use value::{Callable, CallFuture, ComponentClass, ComponentInstance, Object, Value};
