//! The bindings an execution can see.
//!
//! A puzzle exposes its API as named capabilities and state values. The
//! [`ContextBuilder`] validates those names and flattens them into an
//! [`ExecutionContext`]: two index-aligned sequences that become the formal
//! parameters and arguments of the synthesized entry function. Nothing else
//! from the host is reachable by executed code.

use std::sync::Arc;

use super::generation::GenerationLease;
use crate::error::ConstructionError;
use crate::evaluator::{HostFunction, Value};
use crate::script::lexer::KEYWORDS;

/// Words that can never be binding names, beyond the script keywords.
const RESERVED_WORDS: &[&str] = &[
    "case",
    "class",
    "debugger",
    "default",
    "delete",
    "enum",
    "export",
    "extends",
    "import",
    "instanceof",
    "super",
    "switch",
    "this",
    "void",
    "with",
    "yield",
    "implements",
    "interface",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "arguments",
    "eval",
];

pub fn is_reserved_word(name: &str) -> bool {
    KEYWORDS.contains(&name) || RESERVED_WORDS.contains(&name)
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Anything that can contribute bindings for an attempt.
///
/// The lease is the attempt's generation; capabilities with effects should
/// refuse once it goes stale.
pub trait CapabilitySet: Send + Sync {
    fn bindings(&self, lease: &GenerationLease) -> Vec<(String, Value)>;
}

/// Collects bindings and validates them on [`build`](Self::build).
#[derive(Clone, Default)]
pub struct ContextBuilder {
    entries: Vec<(String, Value)>,
    lease: Option<GenerationLease>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value (puzzle state, a shared array, an object of functions).
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    /// Bind a host function.
    pub fn capability(mut self, name: impl Into<String>, function: Arc<dyn HostFunction>) -> Self {
        self.entries.push((name.into(), Value::host(function)));
        self
    }

    pub fn extend<I, K>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.entries
            .extend(bindings.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Add every binding from `set`, generated for `lease`.
    pub fn capabilities(self, set: &dyn CapabilitySet, lease: &GenerationLease) -> Self {
        self.extend(set.bindings(lease))
    }

    /// Attach the attempt's lease; the interpreter unwinds once it goes stale.
    pub fn lease(mut self, lease: GenerationLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Validate names and produce the context. The builder can be reused;
    /// building twice yields equal pairs sharing the same host functions.
    pub fn build(&self) -> Result<ExecutionContext, ConstructionError> {
        let mut names: Vec<String> = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            if !is_identifier(name) {
                return Err(ConstructionError::InvalidIdentifier(name.clone()));
            }
            if is_reserved_word(name) {
                return Err(ConstructionError::ReservedWord(name.clone()));
            }
            if names.iter().any(|existing| existing == name) {
                return Err(ConstructionError::DuplicateBinding(name.clone()));
            }
            names.push(name.clone());
            values.push(value.clone());
        }
        Ok(ExecutionContext {
            names,
            values,
            lease: self.lease.clone(),
        })
    }
}

/// Ordered name/value bindings for one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    names: Vec<String>,
    values: Vec<Value>,
    lease: Option<GenerationLease>,
}

impl ExecutionContext {
    /// A context with no bindings.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn lease(&self) -> Option<&GenerationLease> {
        self.lease.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Value>, Option<GenerationLease>) {
        (self.names, self.values, self.lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::sync_fn;

    #[test]
    fn test_build_preserves_order_and_alignment() {
        let ctx = ContextBuilder::new()
            .value("ropeLength", 10)
            .value("label", "rope")
            .build()
            .unwrap();
        assert_eq!(ctx.names(), &["ropeLength".to_string(), "label".to_string()]);
        assert_eq!(ctx.get("label"), Some(&Value::from("rope")));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_building_twice_shares_host_functions() {
        let add_cut = sync_fn("addCut", |_| Ok(Value::Undefined));
        let builder = ContextBuilder::new()
            .capability("addCut", add_cut)
            .value("ropeLength", 10);
        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first.names(), second.names());
        for (a, b) in first.values().iter().zip(second.values()) {
            assert!(a.strict_equals(b));
        }
    }

    #[test]
    fn test_rejects_bad_names() {
        let err = ContextBuilder::new().value("rope-length", 1).build().unwrap_err();
        assert_eq!(err, ConstructionError::InvalidIdentifier("rope-length".into()));

        let err = ContextBuilder::new().value("class", 1).build().unwrap_err();
        assert_eq!(err, ConstructionError::ReservedWord("class".into()));

        let err = ContextBuilder::new().value("await", 1).build().unwrap_err();
        assert_eq!(err, ConstructionError::ReservedWord("await".into()));

        let err = ContextBuilder::new()
            .value("cuts", 1)
            .value("cuts", 2)
            .build()
            .unwrap_err();
        assert_eq!(err, ConstructionError::DuplicateBinding("cuts".into()));
    }

    #[test]
    fn test_empty_context_is_valid() {
        let ctx = ContextBuilder::new().build().unwrap();
        assert!(ctx.is_empty());
        let (names, values, lease) = ctx.into_parts();
        assert!(names.is_empty() && values.is_empty() && lease.is_none());
    }
}
