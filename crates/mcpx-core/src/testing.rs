//! Test fixtures: a scripted module runtime, a compiler that can be made to
//! fail, and a throwaway project layout.
//!
//! Artifacts are interpreted line by line:
//!
//! ```text
//! import { z } from 'zod';      resolved through the loader's resolver
//! throw <message>               execution fails with <message>
//! kind tool|resource|prompt     export a component of that kind
//! name / uri / description / content <value>
//! form class|instance|default|legacy
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use crate::build::{Compiler, Materializer, ModuleResolver};
use crate::components::{
    Callable, ComponentClass, ComponentInstance, ComponentKind, DirectoryLoader, DynamicLoader,
    ModuleRuntime, Object, Registry, Value,
};
use crate::config::{ComponentDirectories, DirectoryOptions, ProjectConfig};

/// Source marker that makes [`ScriptCompiler`] fail
pub const SYNTAX_ERROR: &str = "SYNTAX ERROR";

/// Write `contents` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

/// Move a file's modification time `ahead` into the future
pub fn bump_mtime(path: &Path, ahead: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + ahead).unwrap();
}

/// Passthrough compiler that rejects sources containing [`SYNTAX_ERROR`]
pub struct ScriptCompiler;

#[async_trait]
impl Compiler for ScriptCompiler {
    async fn compile(&self, source: &str, source_path: &Path) -> anyhow::Result<String> {
        if source.contains(SYNTAX_ERROR) {
            bail!("unexpected token in {}", source_path.display());
        }
        Ok(source.to_string())
    }
}

struct ScriptInstance {
    kind: ComponentKind,
    definition: Object,
}

impl ComponentInstance for ScriptInstance {
    fn base(&self) -> Option<ComponentKind> {
        Some(self.kind)
    }

    fn to_definition(&self) -> anyhow::Result<Object> {
        Ok(self.definition.clone())
    }
}

struct ScriptClass {
    kind: ComponentKind,
    definition: Object,
}

impl ComponentClass for ScriptClass {
    fn base(&self) -> Option<ComponentKind> {
        Some(self.kind)
    }

    fn instantiate(&self) -> anyhow::Result<Arc<dyn ComponentInstance>> {
        Ok(Arc::new(ScriptInstance {
            kind: self.kind,
            definition: self.definition.clone(),
        }))
    }
}

/// Interprets the line format described in the module docs
pub struct ScriptRuntime;

#[async_trait]
impl ModuleRuntime for ScriptRuntime {
    async fn execute(
        &self,
        artifact: &Path,
        resolver: &dyn ModuleResolver,
    ) -> anyhow::Result<Value> {
        let text = tokio::fs::read_to_string(artifact)
            .await
            .with_context(|| format!("cannot read {}", artifact.display()))?;
        let context_dir = artifact.parent().unwrap_or(Path::new("/"));

        let mut kind = None;
        let mut form = "plain";
        let mut fields = Object::new();

        for line in text.lines().map(str::trim) {
            if line.starts_with("import") {
                if let Some(specifier) = quoted(line) {
                    resolver.resolve(specifier, context_dir)?;
                }
                continue;
            }
            let (key, rest) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "throw" => bail!("{rest}"),
                "kind" => kind = Some(rest.parse::<ComponentKind>().map_err(anyhow::Error::msg)?),
                "form" => form = rest,
                "name" | "uri" | "description" | "content" => fields.insert(key, rest),
                _ => {}
            }
        }

        let Some(kind) = kind else {
            return Ok(Value::Object(Object::new()));
        };
        let definition = build_definition(kind, fields, form == "legacy");

        Ok(match form {
            "class" => Value::Class(Arc::new(ScriptClass { kind, definition })),
            "instance" => Value::Instance(Arc::new(ScriptInstance { kind, definition })),
            "default" => Value::Object(Object::new().with("default", definition)),
            _ => Value::Object(definition),
        })
    }
}

fn quoted(line: &str) -> Option<&str> {
    let start = line.find(['\'', '"'])?;
    let quote = line[start..].chars().next()?;
    let rest = &line[start + 1..];
    rest.find(quote).map(|end| &rest[..end])
}

fn build_definition(kind: ComponentKind, mut obj: Object, legacy: bool) -> Object {
    match kind {
        ComponentKind::Tool => {
            let schema_slot = if legacy { "parameters" } else { "inputSchema" };
            obj.insert(
                schema_slot,
                json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}),
            );
            obj.insert(
                "execute",
                Callable::from_fn(|args| {
                    let a = args["a"].as_i64().unwrap_or_default();
                    let b = args["b"].as_i64().unwrap_or_default();
                    Ok(json!(a + b))
                }),
            );
        }
        ComponentKind::Resource => {}
        ComponentKind::Prompt => {
            obj.insert(
                "arguments",
                json!([{"name": "who", "description": "Who to greet", "required": false}]),
            );
            obj.insert(
                "getMessages",
                Callable::from_fn(|args| {
                    let who = args["who"].as_str().unwrap_or("world").to_string();
                    Ok(json!([
                        {"role": "user", "content": {"type": "text", "text": format!("Hello {who}")}}
                    ]))
                }),
            );
        }
    }
    obj
}

/// Temporary project with a staging directory beside it
pub struct Project {
    _dir: TempDir,
    root: PathBuf,
    staging: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("project");
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&root).unwrap();
        Self {
            _dir: dir,
            root,
            staging,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn config(&self) -> ProjectConfig {
        ProjectConfig::new(&self.root).with_staging_dir(&self.staging)
    }

    pub fn options(&self, kind: ComponentKind) -> DirectoryOptions {
        self.config().directories().get(kind).clone()
    }

    pub fn directories(&self) -> ComponentDirectories {
        self.config().directories()
    }

    pub fn materializer(&self) -> Arc<Materializer> {
        Arc::new(Materializer::new(
            &self.root,
            &self.staging,
            Arc::new(ScriptCompiler),
        ))
    }

    pub fn directory_loader(&self) -> DirectoryLoader {
        let materializer = self.materializer();
        let resolver = Arc::new(materializer.resolver());
        DirectoryLoader::new(
            materializer,
            DynamicLoader::new(Arc::new(ScriptRuntime), resolver),
        )
    }

    /// Registry wired like [`Registry::from_config`], with the script
    /// compiler in place of the configured one
    pub fn registry(&self) -> Registry {
        let loader = self.directory_loader();
        let item_loader =
            crate::components::DirectoryItemLoader::new(loader.clone(), self.directories());
        Registry::new(loader).with_item_loader(Arc::new(item_loader))
    }
}
