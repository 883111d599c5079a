//! Runtime values seen by executed code.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use super::host::HostFunction;
use super::intrinsics::Intrinsic;
use super::scope::Scope;
use super::type_coercion::{number_to_string, to_string};
use crate::script::FunctionDecl;

/// JSON conversion stops descending past this depth.
const MAX_JSON_DEPTH: usize = 64;

/// The built-in error families scripts can construct and catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub kind: ErrorKind,
    pub message: String,
}

/// Insertion-ordered string-keyed properties.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(String, Value)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

/// A script function together with the scope it closes over.
pub struct Closure {
    pub decl: Arc<FunctionDecl>,
    pub scope: Scope,
}

/// Anything executed code can call.
#[derive(Clone)]
pub enum Callable {
    Host(Arc<dyn HostFunction>),
    Script(Arc<Closure>),
    Intrinsic(Intrinsic),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Host(f) => f.name(),
            Callable::Script(closure) => closure.decl.name.as_deref().unwrap_or(""),
            Callable::Intrinsic(intrinsic) => intrinsic.name(),
        }
    }

    /// Reference identity; two intrinsics are the same if they do the same thing.
    pub fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Host(a), Callable::Host(b)) => Arc::ptr_eq(a, b),
            (Callable::Script(a), Callable::Script(b)) => Arc::ptr_eq(a, b),
            (Callable::Intrinsic(a), Callable::Intrinsic(b)) => a == b,
            _ => false,
        }
    }
}

/// A dynamically typed script value.
///
/// Arrays and objects are shared references: copying a `Value` aliases
/// the same storage, matching how scripts observe mutation.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Arc<Mutex<Vec<Value>>>),
    Object(Arc<Mutex<PropertyMap>>),
    Function(Callable),
    Error(Arc<ErrorObject>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(Mutex::new(items)))
    }

    pub fn object(properties: PropertyMap) -> Self {
        Value::Object(Arc::new(Mutex::new(properties)))
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Value::Error(Arc::new(ErrorObject {
            kind,
            message: message.into(),
        }))
    }

    pub fn host(function: Arc<dyn HostFunction>) -> Self {
        Value::Function(Callable::Host(function))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorObject> {
        match self {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Strict (`===`) equality: reference identity for shared values.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.same(b),
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Build a value from JSON, e.g. puzzle state loaded by the host.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Snapshot a value as JSON. Functions and `undefined` become `null`,
    /// errors become `{name, message}`, non-finite numbers become `null`.
    pub fn to_json(&self) -> JsonValue {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> JsonValue {
        if depth > MAX_JSON_DEPTH {
            return JsonValue::Null;
        }
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    JsonValue::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(JsonValue::Number)
                        .unwrap_or(JsonValue::Null)
                }
            }
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => {
                let items = items.lock().clone();
                JsonValue::Array(items.iter().map(|v| v.to_json_at(depth + 1)).collect())
            }
            Value::Object(props) => {
                let props = props.lock().clone();
                JsonValue::Object(
                    props
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_json_at(depth + 1)))
                        .collect(),
                )
            }
            Value::Error(err) => serde_json::json!({
                "name": err.kind.name(),
                "message": err.message,
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            Value::Function(callable) => write!(f, "[Function {}]", callable.name()),
            Value::Error(err) => write!(f, "{}: {}", err.kind.name(), err.message),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_string(self))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}
