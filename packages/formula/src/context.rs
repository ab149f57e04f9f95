//! Name resolution for formula evaluation.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use std::collections::HashMap;

/// Source of values for bare references.
pub trait EvaluationContext {
    /// Value bound to a root name (field identifier, lambda parameter, ...)
    fn lookup(&self, name: &str) -> Option<Value>;

    fn resolve(&self, name: &str) -> EvalResult<Value> {
        self.lookup(name)
            .ok_or_else(|| EvalError::unknown_reference(name))
    }
}

/// Fixed set of named values
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    values: HashMap<String, Value>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

impl EvaluationContext for MapContext {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Lambda parameter bindings layered over a parent context
pub struct ScopedContext<'a> {
    parent: &'a dyn EvaluationContext,
    bindings: HashMap<String, Value>,
}

impl<'a> ScopedContext<'a> {
    pub fn new(parent: &'a dyn EvaluationContext) -> Self {
        Self {
            parent,
            bindings: HashMap::new(),
        }
    }

    pub fn bind(mut self, name: &str, value: Value) -> Self {
        self.bindings.insert(name.to_string(), value);
        self
    }
}

impl EvaluationContext for ScopedContext<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.bindings
            .get(name)
            .cloned()
            .or_else(|| self.parent.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_shadows_parent() {
        let root = MapContext::new().with("x", 1.0).with("y", 2.0);
        let scope = ScopedContext::new(&root).bind("x", Value::Number(10.0));

        assert_eq!(scope.lookup("x"), Some(Value::Number(10.0)));
        assert_eq!(scope.lookup("y"), Some(Value::Number(2.0)));
        assert!(matches!(scope.resolve("z"), Err(EvalError::UnknownReference { .. })));
    }
}
