//! Component Type Definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::validate;
use super::value::{Callable, Object, Value};

/// The three component kinds a project can author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Tool,
    Resource,
    Prompt,
}

impl ComponentKind {
    /// All kinds, in load order
    pub const ALL: [ComponentKind; 3] = [Self::Tool, Self::Resource, Self::Prompt];

    /// Base name a source file must carry to be discovered as this kind
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::Prompt => "prompt",
        }
    }

    /// Plural label used in logs and directory defaults
    pub fn plural(self) -> &'static str {
        match self {
            Self::Tool => "tools",
            Self::Resource => "resources",
            Self::Prompt => "prompts",
        }
    }

    /// Kind whose file stem equals `stem`
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.file_stem() == stem)
    }

    /// Check a candidate against this kind's structural contract
    pub fn validate(self, candidate: &Object) -> bool {
        match self {
            Self::Tool => validate::validate_tool(candidate),
            Self::Resource => validate::validate_resource(candidate),
            Self::Prompt => validate::validate_prompt(candidate),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tool" | "tools" => Ok(Self::Tool),
            "resource" | "resources" => Ok(Self::Resource),
            "prompt" | "prompts" => Ok(Self::Prompt),
            other => Err(format!("unknown component kind: {other}")),
        }
    }
}

/// Tool definition
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Tool name (unique across tools)
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Input schema (structural shape, usually JSON Schema)
    pub input_schema: JsonValue,
    /// Output schema
    pub output_schema: Option<JsonValue>,
    /// Behavior hints
    pub annotations: Option<JsonValue>,
    /// Handler
    pub execute: Callable,
}

impl ToolDefinition {
    /// Build from a candidate that satisfies the tool contract
    pub fn from_object(obj: &Object) -> Option<Self> {
        if !validate::validate_tool(obj) {
            return None;
        }

        let input_schema = obj
            .get("inputSchema")
            .or_else(|| obj.get("parameters"))
            .map(Value::to_json)?;

        Some(Self {
            name: obj.get_str("name")?.to_string(),
            description: obj.get_str("description").map(str::to_string),
            input_schema,
            output_schema: obj.get("outputSchema").map(Value::to_json),
            annotations: obj.get("annotations").map(Value::to_json),
            execute: obj.get_callable("execute")?.clone(),
        })
    }

    /// Run the tool handler
    pub async fn execute(&self, args: JsonValue) -> anyhow::Result<JsonValue> {
        self.execute.call(args).await
    }
}

/// Resource content: fixed text or produced on demand
#[derive(Debug, Clone)]
pub enum ResourceContent {
    Text(String),
    Dynamic(Callable),
}

/// Resource definition
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Resource URI (unique across resources)
    pub uri: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// MIME type
    pub content_type: Option<String>,
    /// Content
    pub content: ResourceContent,
}

impl ResourceDefinition {
    /// Build from a candidate that satisfies the resource contract
    pub fn from_object(obj: &Object) -> Option<Self> {
        if !validate::validate_resource(obj) {
            return None;
        }

        let content = match obj.get("content")? {
            Value::Function(f) => ResourceContent::Dynamic(f.clone()),
            other => ResourceContent::Text(other.as_str()?.to_string()),
        };

        Some(Self {
            uri: obj.get_str("uri")?.to_string(),
            name: obj.get_str("name")?.to_string(),
            description: obj.get_str("description").map(str::to_string),
            content_type: obj
                .get_str("contentType")
                .or_else(|| obj.get_str("mimeType"))
                .map(str::to_string),
            content,
        })
    }

    /// Read the resource text
    pub async fn read(&self) -> anyhow::Result<String> {
        match &self.content {
            ResourceContent::Text(text) => Ok(text.clone()),
            ResourceContent::Dynamic(f) => match f.call(JsonValue::Null).await? {
                JsonValue::String(text) => Ok(text),
                other => Ok(other.to_string()),
            },
        }
    }
}

/// Prompt argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Message produced by a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: JsonValue,
}

/// Prompt definition
#[derive(Debug, Clone)]
pub struct PromptDefinition {
    /// Prompt name (unique across prompts)
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Declared arguments
    pub arguments: Vec<PromptArgument>,
    /// Message producer
    pub get_messages: Callable,
}

impl PromptDefinition {
    /// Build from a candidate that satisfies the prompt contract
    pub fn from_object(obj: &Object) -> Option<Self> {
        if !validate::validate_prompt(obj) {
            return None;
        }

        Some(Self {
            name: obj.get_str("name")?.to_string(),
            description: obj.get_str("description").map(str::to_string),
            arguments: obj
                .get("arguments")
                .or_else(|| obj.get("schema"))
                .map(|v| parse_arguments(&v.to_json()))
                .unwrap_or_default(),
            get_messages: obj.get_callable("getMessages")?.clone(),
        })
    }

    /// Render the prompt's messages
    pub async fn messages(&self, args: JsonValue) -> anyhow::Result<Vec<PromptMessage>> {
        let raw = self.get_messages.call(args).await?;
        Ok(serde_json::from_value(raw)?)
    }
}

/// Accepts either a list of argument objects or a map of name → options
fn parse_arguments(value: &JsonValue) -> Vec<PromptArgument> {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        JsonValue::Object(map) => map
            .iter()
            .map(|(name, opts)| PromptArgument {
                name: name.clone(),
                description: opts
                    .get("description")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string),
                required: opts
                    .get("required")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// A validated component, tagged by kind once at load time
#[derive(Debug, Clone)]
pub enum ComponentDefinition {
    Tool(ToolDefinition),
    Resource(ResourceDefinition),
    Prompt(PromptDefinition),
}

impl ComponentDefinition {
    /// Convert a candidate into the definition for `kind`
    pub fn from_object(kind: ComponentKind, obj: &Object) -> Option<Self> {
        match kind {
            ComponentKind::Tool => ToolDefinition::from_object(obj).map(Self::Tool),
            ComponentKind::Resource => ResourceDefinition::from_object(obj).map(Self::Resource),
            ComponentKind::Prompt => PromptDefinition::from_object(obj).map(Self::Prompt),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Tool(_) => ComponentKind::Tool,
            Self::Resource(_) => ComponentKind::Resource,
            Self::Prompt(_) => ComponentKind::Prompt,
        }
    }

    /// Registry identifier: tool name, resource uri, or prompt name
    pub fn id(&self) -> &str {
        match self {
            Self::Tool(t) => &t.name,
            Self::Resource(r) => &r.uri,
            Self::Prompt(p) => &p.name,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolDefinition> {
        match self {
            Self::Tool(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceDefinition> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_prompt(&self) -> Option<&PromptDefinition> {
        match self {
            Self::Prompt(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn math_tool() -> Object {
        Object::new()
            .with("name", "math")
            .with("description", "Adds numbers")
            .with("inputSchema", json!({"type": "object"}))
            .with(
                "execute",
                Callable::from_fn(|args| {
                    let a = args["a"].as_i64().unwrap_or_default();
                    let b = args["b"].as_i64().unwrap_or_default();
                    Ok(json!(a + b))
                }),
            )
    }

    #[test]
    fn test_kind_file_stems() {
        assert_eq!(ComponentKind::from_file_stem("tool"), Some(ComponentKind::Tool));
        assert_eq!(ComponentKind::from_file_stem("prompt"), Some(ComponentKind::Prompt));
        assert_eq!(ComponentKind::from_file_stem("tools"), None);
        assert_eq!("Resources".parse::<ComponentKind>(), Ok(ComponentKind::Resource));
        assert!("widget".parse::<ComponentKind>().is_err());
    }

    #[tokio::test]
    async fn test_tool_definition() {
        let def = ComponentDefinition::from_object(ComponentKind::Tool, &math_tool()).unwrap();
        assert_eq!(def.kind(), ComponentKind::Tool);
        assert_eq!(def.id(), "math");

        let tool = def.as_tool().unwrap();
        assert_eq!(tool.description.as_deref(), Some("Adds numbers"));
        assert_eq!(tool.execute(json!({"a": 2, "b": 3})).await.unwrap(), json!(5));
    }

    #[test]
    fn test_tool_definition_accepts_legacy_parameters() {
        let mut obj = math_tool();
        obj.remove("inputSchema");
        obj.insert("parameters", json!({"type": "object", "properties": {}}));

        let tool = ToolDefinition::from_object(&obj).unwrap();
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[tokio::test]
    async fn test_resource_static_and_dynamic() {
        let fixed = Object::new()
            .with("uri", "resource://x")
            .with("name", "x")
            .with("content", "hello");
        let res = ResourceDefinition::from_object(&fixed).unwrap();
        assert_eq!(res.read().await.unwrap(), "hello");

        let dynamic = Object::new()
            .with("uri", "resource://clock")
            .with("name", "clock")
            .with("mimeType", "text/plain")
            .with("content", Callable::from_fn(|_| Ok(json!("tick"))));
        let res = ResourceDefinition::from_object(&dynamic).unwrap();
        assert_eq!(res.content_type.as_deref(), Some("text/plain"));
        assert_eq!(res.read().await.unwrap(), "tick");
    }

    #[tokio::test]
    async fn test_prompt_messages_and_arguments() {
        let obj = Object::new()
            .with("name", "greet")
            .with(
                "schema",
                json!({"who": {"type": "string", "description": "Name", "required": true}}),
            )
            .with(
                "getMessages",
                Callable::from_fn(|args| {
                    let who = args["who"].as_str().unwrap_or("world").to_string();
                    Ok(json!([
                        {"role": "user", "content": {"type": "text", "text": format!("Hello {who}")}}
                    ]))
                }),
            );

        let prompt = PromptDefinition::from_object(&obj).unwrap();
        assert_eq!(
            prompt.arguments,
            vec![PromptArgument {
                name: "who".into(),
                description: Some("Name".into()),
                required: true,
            }]
        );

        let messages = prompt.messages(json!({"who": "Ada"})).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content["text"], "Hello Ada");
    }
}
