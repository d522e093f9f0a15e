//! Modifier Registry - Name to Transformation Lookup
//!
//! Registration needs `&mut self`, so a registry shared behind `&` or `Arc`
//! is frozen. Callers that must register while rendering concurrently wrap
//! it in a lock of their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::template::Arg;
use crate::value::{Context, Value};

/// Failures a modifier reports about its own input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModifierError {
    #[error("expected at least {expected} argument(s), got {got}")]
    MissingArgument { expected: usize, got: usize },

    #[error("argument {index} is invalid: {reason}")]
    InvalidArgument { index: usize, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// A named transformation applied to a resolved value.
///
/// Implementations must be pure in `(value, args, context)`.
pub trait Modifier: Send + Sync {
    fn apply(&self, value: Value, args: &[Arg], context: &Context) -> Result<Value, ModifierError>;
}

impl<F> Modifier for F
where
    F: Fn(Value, &[Arg], &Context) -> Result<Value, ModifierError> + Send + Sync,
{
    fn apply(&self, value: Value, args: &[Arg], context: &Context) -> Result<Value, ModifierError> {
        self(value, args, context)
    }
}

#[derive(Clone, Default)]
pub struct ModifierRegistry {
    modifiers: HashMap<String, Arc<dyn Modifier>>,
}

impl ModifierRegistry {
    /// An empty registry with no built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::install(&mut registry);
        registry
    }

    /// Installs a closure under `name`, replacing any previous entry.
    pub fn register_modifier<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value, &[Arg], &Context) -> Result<Value, ModifierError> + Send + Sync + 'static,
    {
        self.register(name, f);
    }

    /// Installs any [`Modifier`] under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, modifier: impl Modifier + 'static) {
        let name = name.into();
        if self.modifiers.insert(name.clone(), Arc::new(modifier)).is_some() {
            tracing::debug!(modifier = %name, "overriding registered modifier");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&dyn Modifier> {
        self.modifiers.get(name).map(|m| m.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.modifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierRegistry")
            .field("modifiers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let registry = ModifierRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("upper").is_none());
    }

    #[test]
    fn test_builtins_present() {
        let registry = ModifierRegistry::with_builtins();
        for name in ["upper", "lower", "default", "truncate", "escape"] {
            assert!(registry.contains(name), "{name}");
        }
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ModifierRegistry::with_builtins();
        let before = registry.len();
        registry.register_modifier("upper", |_, _, _| Ok(Value::from("first")));
        registry.register_modifier("upper", |_, _, _| Ok(Value::from("second")));
        assert_eq!(registry.len(), before);

        let out = registry
            .resolve("upper")
            .unwrap()
            .apply(Value::from("x"), &[], &Context::new())
            .unwrap();
        assert_eq!(out, Value::from("second"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = ModifierRegistry::new();
        registry.register_modifier("b", |v, _, _| Ok(v));
        registry.register_modifier("a", |v, _, _| Ok(v));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModifierRegistry>();
    }
}
