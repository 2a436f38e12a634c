//! MCP Descriptors
//!
//! Serializable views of registry items in the shape an MCP server
//! advertises them (`tools/list`, `resources/list`, `prompts/list`).
//!
//! ```text
//! Registry
//!       ↓
//! McpCatalog (ComponentDefinition → MCP descriptor)
//!       ↓
//! Transport (serves descriptors, dispatches calls back to the registry)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::types::{
    ComponentDefinition, PromptArgument, PromptDefinition, ResourceDefinition, ToolDefinition,
};

/// MCP tool descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<JsonValue>,
}

impl From<&ToolDefinition> for McpTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
            output_schema: tool.output_schema.clone(),
            annotations: tool.annotations.clone(),
        }
    }
}

/// MCP resource descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpResource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl From<&ResourceDefinition> for McpResource {
    fn from(resource: &ResourceDefinition) -> Self {
        Self {
            uri: resource.uri.clone(),
            name: resource.name.clone(),
            description: resource.description.clone(),
            mime_type: resource.content_type.clone(),
        }
    }
}

/// MCP prompt descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPrompt {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
}

impl From<&PromptDefinition> for McpPrompt {
    fn from(prompt: &PromptDefinition) -> Self {
        Self {
            name: prompt.name.clone(),
            description: prompt.description.clone(),
            arguments: (!prompt.arguments.is_empty()).then(|| prompt.arguments.clone()),
        }
    }
}

/// Everything a server advertises, sorted by identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpCatalog {
    pub tools: Vec<McpTool>,
    pub resources: Vec<McpResource>,
    pub prompts: Vec<McpPrompt>,
}

impl McpCatalog {
    pub fn from_definitions<'a>(definitions: impl IntoIterator<Item = &'a ComponentDefinition>) -> Self {
        let mut catalog = Self::default();
        for definition in definitions {
            match definition {
                ComponentDefinition::Tool(t) => catalog.tools.push(t.into()),
                ComponentDefinition::Resource(r) => catalog.resources.push(r.into()),
                ComponentDefinition::Prompt(p) => catalog.prompts.push(p.into()),
            }
        }
        catalog.tools.sort_by(|a, b| a.name.cmp(&b.name));
        catalog.resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        catalog.prompts.sort_by(|a, b| a.name.cmp(&b.name));
        catalog
    }

    pub fn len(&self) -> usize {
        self.tools.len() + self.resources.len() + self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
