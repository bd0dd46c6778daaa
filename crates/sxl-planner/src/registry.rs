//! Registry of `ActionDescriptor`s, keyed by action id (§3).
//!
//! Backed by `IndexMap` rather than `HashMap` so iteration (used by the prompt
//! builder) follows registration order, the same choice the agent registry made
//! for its fallback-ordered lookups.

use indexmap::IndexMap;
use thiserror::Error;

use crate::descriptor::ActionDescriptor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    DuplicateActionId(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, ActionDescriptor>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ActionDescriptor) -> Result<(), RegistryError> {
        if self.actions.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateActionId(descriptor.id));
        }
        self.actions.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    pub fn lookup(&self, action_id: &str) -> Result<&ActionDescriptor, RegistryError> {
        self.actions.get(action_id).ok_or_else(|| RegistryError::UnknownAction(action_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> ActionDescriptor {
        ActionDescriptor::new(id, "test action")
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ActionRegistry::new();
        registry.register(descriptor("greet")).unwrap();
        let err = registry.register(descriptor("greet")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateActionId("greet".into()));
    }

    #[test]
    fn unknown_action_lookup_is_reported() {
        let registry = ActionRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert_eq!(err, RegistryError::UnknownAction("missing".into()));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = ActionRegistry::new();
        registry.register(descriptor("b")).unwrap();
        registry.register(descriptor("a")).unwrap();
        let ids: Vec<_> = registry.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
