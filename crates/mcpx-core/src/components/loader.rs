//! Dynamic Loader
//!
//! Executes a staged artifact through a [`ModuleRuntime`] and normalizes the
//! exported value to a plain structural candidate for validation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::value::{Object, Value};
use crate::build::ModuleResolver;
use crate::error::{Error, Result};

/// Slot a module's primary export is wrapped in
const DEFAULT_EXPORT: &str = "default";

/// Executes artifacts and hands back their exported value
#[async_trait]
pub trait ModuleRuntime: Send + Sync {
    /// Execute `artifact`, resolving its imports through `resolver`
    async fn execute(&self, artifact: &Path, resolver: &dyn ModuleResolver)
    -> anyhow::Result<Value>;
}

/// Loads artifacts and unwraps their exports
#[derive(Clone)]
pub struct DynamicLoader {
    runtime: Arc<dyn ModuleRuntime>,
    resolver: Arc<dyn ModuleResolver>,
}

impl DynamicLoader {
    pub fn new(runtime: Arc<dyn ModuleRuntime>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self { runtime, resolver }
    }

    /// Execute `artifact` and return its raw export
    pub async fn load(&self, artifact: &Path) -> Result<Value> {
        debug!(path = %artifact.display(), "Loading module");
        self.runtime
            .execute(artifact, self.resolver.as_ref())
            .await
            .map_err(|e| Error::module_load(artifact, format!("{e:#}")))
    }

    /// Execute `artifact` and normalize its export; `None` when the export
    /// is not object-shaped
    pub async fn load_candidate(&self, artifact: &Path) -> Result<Option<Object>> {
        let value = self.load(artifact).await?;
        normalize_export(value).map_err(|e| Error::module_load(artifact, format!("{e:#}")))
    }
}

/// Reduce a module export to a structural candidate
///
/// Unwraps one level of `default`, turns recognized class and instance forms
/// into their definitions, and renames a legacy `parameters` slot to
/// `inputSchema`. Anything else yields `None`.
pub fn normalize_export(value: Value) -> anyhow::Result<Option<Object>> {
    let value = unwrap_default(value);

    let candidate = match value {
        Value::Class(class) => match class.base() {
            Some(kind) => {
                debug!(kind = %kind, "Instantiating class export");
                class.instantiate()?.to_definition()?
            }
            None => return Ok(None),
        },
        Value::Instance(instance) => match instance.base() {
            Some(_) => instance.to_definition()?,
            None => return Ok(None),
        },
        Value::Object(obj) => obj,
        Value::Data(JsonValue::Object(map)) => Object::from(map),
        Value::Data(_) | Value::Function(_) => return Ok(None),
    };

    Ok(Some(rename_legacy_parameters(candidate)))
}

fn unwrap_default(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.contains(DEFAULT_EXPORT) => {
            obj.remove(DEFAULT_EXPORT).unwrap_or(Value::Object(obj))
        }
        Value::Data(JsonValue::Object(mut map)) if map.contains_key(DEFAULT_EXPORT) => {
            match map.remove(DEFAULT_EXPORT) {
                Some(inner) if !inner.is_null() => Value::Data(inner),
                _ => Value::Data(JsonValue::Object(map)),
            }
        }
        other => other,
    }
}

fn rename_legacy_parameters(mut obj: Object) -> Object {
    if !obj.contains("inputSchema") {
        if let Some(parameters) = obj.remove("parameters") {
            obj.insert("inputSchema", parameters);
        }
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::types::ComponentKind;
    use crate::components::value::{Callable, ComponentClass, ComponentInstance};
    use serde_json::json;

    struct GreetPrompt;

    impl ComponentInstance for GreetPrompt {
        fn base(&self) -> Option<ComponentKind> {
            Some(ComponentKind::Prompt)
        }

        fn to_definition(&self) -> anyhow::Result<Object> {
            Ok(Object::new()
                .with("name", "greet")
                .with("getMessages", Callable::from_fn(|_| Ok(json!([])))))
        }
    }

    struct GreetClass;

    impl ComponentClass for GreetClass {
        fn base(&self) -> Option<ComponentKind> {
            Some(ComponentKind::Prompt)
        }

        fn instantiate(&self) -> anyhow::Result<Arc<dyn ComponentInstance>> {
            Ok(Arc::new(GreetPrompt))
        }
    }

    struct Unrelated;

    impl ComponentClass for Unrelated {
        fn base(&self) -> Option<ComponentKind> {
            None
        }

        fn instantiate(&self) -> anyhow::Result<Arc<dyn ComponentInstance>> {
            anyhow::bail!("should not be constructed")
        }
    }

    struct Exploding;

    impl ComponentClass for Exploding {
        fn base(&self) -> Option<ComponentKind> {
            Some(ComponentKind::Tool)
        }

        fn instantiate(&self) -> anyhow::Result<Arc<dyn ComponentInstance>> {
            anyhow::bail!("constructor threw")
        }
    }

    #[test]
    fn test_default_wrapper_is_unwrapped_once() {
        let inner = Object::new().with("name", "math");
        let wrapped = Object::new().with(DEFAULT_EXPORT, inner);

        let candidate = normalize_export(wrapped.into()).unwrap().unwrap();
        assert_eq!(candidate.get_str("name"), Some("math"));

        let twice = Object::new().with(
            DEFAULT_EXPORT,
            Object::new().with(DEFAULT_EXPORT, Object::new().with("name", "math")),
        );
        let candidate = normalize_export(twice.into()).unwrap().unwrap();
        assert!(candidate.contains(DEFAULT_EXPORT));
        assert!(!candidate.contains("name"));
    }

    #[test]
    fn test_class_and_instance_forms() {
        let from_class = normalize_export(Value::Class(Arc::new(GreetClass)))
            .unwrap()
            .unwrap();
        assert_eq!(from_class.get_str("name"), Some("greet"));

        let from_instance = normalize_export(Value::Instance(Arc::new(GreetPrompt)))
            .unwrap()
            .unwrap();
        assert!(from_instance.get_callable("getMessages").is_some());

        assert!(
            normalize_export(Value::Class(Arc::new(Unrelated)))
                .unwrap()
                .is_none()
        );
        assert!(normalize_export(Value::Class(Arc::new(Exploding))).is_err());
    }

    #[test]
    fn test_legacy_parameters_renamed() {
        let obj = Object::new()
            .with("name", "math")
            .with("parameters", json!({"type": "object"}));
        let candidate = normalize_export(obj.into()).unwrap().unwrap();
        assert!(candidate.contains("inputSchema"));
        assert!(!candidate.contains("parameters"));

        let both = Object::new()
            .with("inputSchema", json!({"type": "object"}))
            .with("parameters", json!({"legacy": true}));
        let candidate = normalize_export(both.into()).unwrap().unwrap();
        assert_eq!(candidate.get("inputSchema").unwrap().to_json(), json!({"type": "object"}));
    }

    #[test]
    fn test_non_objects_yield_none() {
        assert!(normalize_export(json!("text").into()).unwrap().is_none());
        assert!(normalize_export(json!(null).into()).unwrap().is_none());
        assert!(
            normalize_export(Callable::from_fn(|_| Ok(json!(1))).into())
                .unwrap()
                .is_none()
        );
        let data = normalize_export(json!({"default": {"uri": "resource://x"}}).into())
            .unwrap()
            .unwrap();
        assert_eq!(data.get_str("uri"), Some("resource://x"));
    }
}
