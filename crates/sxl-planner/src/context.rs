//! The shared, typed key-value store threaded through a plan's execution (§4.1, §5, §6).
//!
//! `ExecutionContext` is a thin `AnyMap` wrapper: an `Arc<RwLock<HashMap<String, Box<dyn
//! Any + Send + Sync>>>>` exposing a typed `get::<T>`/`put` contract, so writes are
//! serialized and readers after a producing step never observe a torn map (§5). In
//! practice every value a step produces crosses the host boundary as JSON, so `put`
//! is almost always called with a `serde_json::Value`, but the map itself has no
//! opinion on that — any `'static + Send + Sync` type round-trips.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("context key '{0}' not found")]
    Missing(String),
    #[error("context key '{0}' does not hold the requested type")]
    TypeMismatch(String),
}

/// Cheaply cloneable handle onto one plan's shared execution state.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    inner: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.inner.write().expect("execution context lock poisoned").insert(key.into(), Arc::new(value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().expect("execution context lock poisoned").contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().expect("execution context lock poisoned").remove(key).is_some()
    }

    /// Type-checked retrieval: `Missing` if the key is absent, `TypeMismatch` if it
    /// holds a value of a different concrete type than `T`.
    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> Result<T, ContextError> {
        let guard = self.inner.read().expect("execution context lock poisoned");
        let value = guard.get(key).ok_or_else(|| ContextError::Missing(key.to_string()))?;
        value.downcast_ref::<T>().cloned().ok_or_else(|| ContextError::TypeMismatch(key.to_string()))
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.read().expect("execution context lock poisoned").keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("execution context lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn put_then_get_round_trips() {
        let ctx = ExecutionContext::new();
        ctx.put("customer", json!({"id": "c1", "name": "Ada"}));
        let value: Value = ctx.get("customer").unwrap();
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    fn missing_key_is_reported() {
        let ctx = ExecutionContext::new();
        assert_eq!(ctx.get::<Value>("nope").unwrap_err(), ContextError::Missing("nope".into()));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let ctx = ExecutionContext::new();
        ctx.put("count", 42u32);
        let err = ctx.get::<String>("count").unwrap_err();
        assert_eq!(err, ContextError::TypeMismatch("count".into()));
    }

    #[test]
    fn clones_share_the_same_backing_store() {
        let ctx = ExecutionContext::new();
        let clone = ctx.clone();
        ctx.put("k", json!(1));
        assert!(clone.contains("k"));
    }

    #[test]
    fn remove_reports_whether_a_key_was_present() {
        let ctx = ExecutionContext::new();
        ctx.put("k", json!(1));
        assert!(ctx.remove("k"));
        assert!(!ctx.remove("k"));
    }
}
