//! ST-001: Host value model.
//!
//! Templates only ever see a closed set of receiver shapes: scalars, lists,
//! maps, host objects behind the [`Object`] adapter, zero-argument [`Method`]s
//! and single-argument [`Filter`]s. Variables and filters live in the same
//! namespace, so both are plain `Value`s.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Host adapters
// ============================================================================

/// Adapter for host data that is neither a list nor a map.
///
/// `attr` is tried first during dot-resolution, then `item`. A returned
/// [`Value::Method`] is invoked with no arguments before the next segment.
pub trait Object: fmt::Debug + Send + Sync {
    /// Name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Attribute lookup. `None` means the object has no such attribute.
    fn attr(&self, name: &str) -> Option<Value>;

    /// Keyed lookup, tried when `attr` finds nothing.
    fn item(&self, _key: &str) -> Option<Value> {
        None
    }

    /// Elements yielded by `{% for %}`. `None` means not iterable.
    fn iter(&self) -> Option<Vec<Value>> {
        None
    }

    fn is_truthy(&self) -> bool {
        true
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object>", self.type_name())
    }
}

type MethodFn = dyn Fn() -> Result<Value, String> + Send + Sync;
type FilterFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// A zero-argument callable, invoked automatically by dot-resolution.
#[derive(Clone)]
pub struct Method(Arc<MethodFn>);

impl Method {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> Result<Value, String> {
        (self.0)()
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<method>")
    }
}

/// A single-argument callable applied through `expr|name`.
#[derive(Clone)]
pub struct Filter(Arc<FilterFn>);

impl Filter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, input: Value) -> Result<Value, String> {
        (self.0)(input)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<filter>")
    }
}

/// Struct-like host object: named fields plus zero-argument methods.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.fields.insert(name.into(), Value::Method(Method::new(f)));
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl Object for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attr(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

// ============================================================================
// Value
// ============================================================================

/// Anything a template can reference.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Object(Arc<dyn Object>),
    Method(Method),
    Filter(Filter),
}

impl Value {
    /// Wrap a closure as a filter value.
    pub fn filter<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Value::Filter(Filter::new(f))
    }

    /// Wrap a closure as a zero-argument method value.
    pub fn method<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        Value::Method(Method::new(f))
    }

    /// Convert any serializable host type. Structs become maps.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Value::from)
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Object(obj) => obj.type_name(),
            Value::Method(_) => "method",
            Value::Filter(_) => "filter",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(obj) => obj.is_truthy(),
            Value::Method(_) | Value::Filter(_) => true,
        }
    }

    /// Attribute lookup. Only host objects carry attributes.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.attr(name),
            _ => None,
        }
    }

    /// Keyed lookup: map keys, list indices (negative counts from the end),
    /// or whatever a host object exposes.
    pub fn item(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(key).cloned(),
            Value::List(items) => {
                let index: i64 = key.parse().ok()?;
                let len = i64::try_from(items.len()).ok()?;
                let index = if index < 0 { len + index } else { index };
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
            }
            Value::Object(obj) => obj.item(key),
            _ => None,
        }
    }

    /// Elements for `{% for %}`. Maps yield their keys, strings their characters.
    pub fn iterate(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Map(map) => Some(map.keys().cloned().map(Value::Str).collect()),
            Value::Str(s) => Some(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Object(obj) => obj.iter(),
            _ => None,
        }
    }

    /// Length of a sized value.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Object(obj) => obj.iter().map(|items| items.len()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => fmt_quoted(s, f),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// Quote a string the way Python's `repr` does: single quotes unless the
/// text holds a single quote and no double quote.
fn fmt_quoted(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use fmt::Write as _;
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Shortest round-trip digits, switching to exponent form outside
/// `1e-4 <= |x| < 1e16` with a signed, at least two-digit exponent.
fn fmt_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_nan() {
        return f.write_str("nan");
    }
    if x.is_infinite() {
        return f.write_str(if x > 0.0 { "inf" } else { "-inf" });
    }
    let sci = format!("{x:e}");
    if let Some((mantissa, Ok(exp))) = sci.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        if x != 0.0 && !(-4..16).contains(&exp) {
            let sign = if exp < 0 { '-' } else { '+' };
            return write!(f, "{mantissa}e{sign}{:02}", exp.unsigned_abs());
        }
    }
    let plain = format!("{x}");
    if plain.contains('.') {
        f.write_str(&plain)
    } else {
        write!(f, "{plain}.0")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => fmt_float(*x, f),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_repr(f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_quoted(key, f)?;
                    f.write_str(": ")?;
                    item.fmt_repr(f)?;
                }
                f.write_str("}")
            }
            Value::Object(obj) => obj.display(f),
            Value::Method(_) => f.write_str("<method>"),
            Value::Filter(_) => f.write_str("<filter>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Filter(a), Value::Filter(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or(Value::Float(n as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}
