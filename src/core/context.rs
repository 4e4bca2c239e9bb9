//! ST-002: Render contexts — name → value mappings.
//!
//! A single namespace holds both data and filters. Contexts merge left to
//! right; later entries win on key collision.

use super::value::Value;
use indexmap::IndexMap;
use std::path::Path;

/// Name → value mapping supplied at construction or render time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Overlay `other` onto `self`. Entries in `other` win.
    pub fn merge(&mut self, other: &Context) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// Left-to-right merge of several contexts into a new one.
    pub fn merged<'a>(layers: impl IntoIterator<Item = &'a Context>) -> Context {
        let mut out = Context::new();
        for layer in layers {
            out.merge(layer);
        }
        out
    }

    /// Build from a JSON document. The top level must be an object.
    pub fn from_json_value(doc: serde_json::Value) -> Result<Self, String> {
        match doc {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect()),
            serde_json::Value::Null => Ok(Context::new()),
            other => Err(format!(
                "context document must be a mapping, got {}",
                json_kind(&other)
            )),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let doc: serde_json::Value =
            serde_json::from_str(text).map_err(|e| format!("JSON parse error: {}", e))?;
        Self::from_json_value(doc)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, String> {
        let doc: serde_json::Value =
            serde_yaml_ng::from_str(text).map_err(|e| format!("YAML parse error: {}", e))?;
        Self::from_json_value(doc)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let doc: serde_json::Value =
            toml::from_str(text).map_err(|e| format!("TOML parse error: {}", e))?;
        Self::from_json_value(doc)
    }

    /// Load a context file, picking the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let parsed = match ext.as_str() {
            "json" => Self::from_json_str(&text),
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "toml" => Self::from_toml_str(&text),
            other => Err(format!("unsupported context format: {:?}", other)),
        };
        parsed.map_err(|e| format!("{}: {}", path.display(), e))
    }
}

fn json_kind(doc: &serde_json::Value) -> &'static str {
    match doc {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "mapping",
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
