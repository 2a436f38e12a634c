//! Module Values
//!
//! Dynamic values handed back by a [`ModuleRuntime`](super::ModuleRuntime)
//! after executing an artifact. A value is either plain data, a structural
//! object whose slots may hold callables, or one of the class/instance forms
//! authored against the component base shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::types::ComponentKind;

/// Future returned by a [`Callable`]
pub type CallFuture = Pin<Box<dyn Future<Output = anyhow::Result<JsonValue>> + Send>>;

/// A function slot exported by a loaded module
#[derive(Clone)]
pub struct Callable(Arc<dyn Fn(JsonValue) -> CallFuture + Send + Sync>);

impl Callable {
    /// Wrap an async function
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<JsonValue>> + Send + 'static,
    {
        Self(Arc::new(move |args| -> CallFuture { Box::pin(f(args)) }))
    }

    /// Wrap a synchronous function
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(JsonValue) -> anyhow::Result<JsonValue> + Send + Sync + 'static,
    {
        Self(Arc::new(move |args| -> CallFuture {
            let result = f(args);
            Box::pin(async move { result })
        }))
    }

    /// Invoke the function
    pub async fn call(&self, args: JsonValue) -> anyhow::Result<JsonValue> {
        (self.0)(args).await
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// A constructor authored by extending one of the component base shapes
pub trait ComponentClass: Send + Sync {
    /// Base shape this class extends, `None` when it extends none of them
    fn base(&self) -> Option<ComponentKind>;

    /// Construct an instance with no arguments
    fn instantiate(&self) -> anyhow::Result<Arc<dyn ComponentInstance>>;
}

/// An already-constructed component instance
pub trait ComponentInstance: Send + Sync {
    /// Base shape this instance was built from, `None` when unrecognized
    fn base(&self) -> Option<ComponentKind>;

    /// Convert the instance to its plain structural definition
    fn to_definition(&self) -> anyhow::Result<Object>;
}

/// Value produced by executing a module
#[derive(Clone)]
pub enum Value {
    /// Plain data (strings, numbers, schemas, ...)
    Data(JsonValue),
    /// Structural object whose slots may hold functions
    Object(Object),
    /// Callable slot
    Function(Callable),
    /// Constructor form
    Class(Arc<dyn ComponentClass>),
    /// Instance form
    Instance(Arc<dyn ComponentInstance>),
}

impl Value {
    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Data(JsonValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Callable, if this is a function
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Structural object, if this is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// True for structural objects and JSON objects alike
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Data(JsonValue::Object(_)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Data(JsonValue::Null))
    }

    /// Project to JSON, dropping function, class and instance slots
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Data(v) => v.clone(),
            Value::Object(o) => o.to_json(),
            Value::Function(_) | Value::Class(_) | Value::Instance(_) => JsonValue::Null,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(v) => write!(f, "Data({v})"),
            Value::Object(o) => f.debug_tuple("Object").field(o).finish(),
            Value::Function(_) => f.write_str("Function"),
            Value::Class(c) => write!(f, "Class({:?})", c.base()),
            Value::Instance(i) => write!(f, "Instance({:?})", i.base()),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Data(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Data(JsonValue::String(value.to_string()))
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Value::Function(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

/// Structural object: named slots checked by shape, not by type
#[derive(Clone, Debug, Default)]
pub struct Object {
    slots: BTreeMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.slots.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.slots.remove(key)
    }

    /// Slot lookup; an explicit `null` counts as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.slots.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_callable(&self, key: &str) -> Option<&Callable> {
        self.get(key).and_then(Value::as_callable)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Project to a JSON object, dropping non-data slots
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .slots
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Function(_) | Value::Class(_) | Value::Instance(_)))
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        JsonValue::Object(map)
    }
}

impl From<serde_json::Map<String, JsonValue>> for Object {
    fn from(map: serde_json::Map<String, JsonValue>) -> Self {
        Self {
            slots: map.into_iter().map(|(k, v)| (k, Value::Data(v))).collect(),
        }
    }
}
