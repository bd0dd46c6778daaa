//! Host-facing action descriptions (§3, §4.7).
//!
//! An `ActionDescriptor` is built once at host-registration time and never mutated
//! afterward — the registry hands out shared references, not copies, for the
//! lifetime of the process (§3 Lifecycle).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    ReadOnly,
    Mutate,
}

/// One positional parameter of an action, in the order arguments are bound (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub type_id: String,
    /// When set, the parameter's JSON value is SXL source validated against this DSL.
    #[serde(default)]
    pub dsl_id: Option<String>,
    #[serde(default)]
    pub allowed_regex: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    /// When set, the binder resolves this parameter from the execution context
    /// instead of the step's JSON parameters.
    #[serde(default)]
    pub from_context: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            dsl_id: None,
            allowed_regex: None,
            examples: Vec::new(),
            from_context: None,
        }
    }

    #[must_use]
    pub fn with_dsl(mut self, dsl_id: impl Into<String>) -> Self {
        self.dsl_id = Some(dsl_id.into());
        self
    }

    #[must_use]
    pub fn with_from_context(mut self, key: impl Into<String>) -> Self {
        self.from_context = Some(key.into());
        self
    }
}

/// A host-registered operation: id, description, parameter shape, and the
/// scheduling hints the DAG builder and executor read (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub id: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub examples: Vec<String>,
    pub mutability: Mutability,
    pub cost: u32,
    /// Opaque resource-locality hints; may contain `{name}` templates resolved
    /// from a step's JSON parameters at metadata-build time (§4.7, §GLOSSARY).
    #[serde(default)]
    pub affinities: Vec<String>,
    /// Advisory-only resource tags a parallel scheduler could use to avoid
    /// concurrent conflicting writes; ignored by the default sequential executor (§5).
    #[serde(default)]
    pub resource_reads: Vec<String>,
    #[serde(default)]
    pub resource_writes: Vec<String>,
    #[serde(default)]
    pub context_key: Option<String>,
    #[serde(default)]
    pub additional_context_keys: Vec<String>,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl ActionDescriptor {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            parameters: Vec::new(),
            examples: Vec::new(),
            mutability: Mutability::ReadOnly,
            cost: 1,
            affinities: Vec::new(),
            resource_reads: Vec::new(),
            resource_writes: Vec::new(),
            context_key: None,
            additional_context_keys: Vec::new(),
            idempotent: false,
            max_retries: 0,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    #[must_use]
    pub fn with_context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_additional_context_keys(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.additional_context_keys.extend(keys);
        self
    }

    #[must_use]
    pub fn with_affinities(mut self, affinities: impl IntoIterator<Item = String>) -> Self {
        self.affinities.extend(affinities);
        self
    }

    #[must_use]
    pub fn with_resource_reads(mut self, resources: impl IntoIterator<Item = String>) -> Self {
        self.resource_reads.extend(resources);
        self
    }

    #[must_use]
    pub fn with_resource_writes(mut self, resources: impl IntoIterator<Item = String>) -> Self {
        self.resource_writes.extend(resources);
        self
    }

    #[must_use]
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_expected_descriptor() {
        let descriptor = ActionDescriptor::new("greet", "greets a customer")
            .with_parameter(ParameterSpec::new("name", "string"))
            .with_mutability(Mutability::ReadOnly)
            .with_context_key("greeting")
            .idempotent(true);
        assert_eq!(descriptor.id, "greet");
        assert_eq!(descriptor.parameters.len(), 1);
        assert!(descriptor.idempotent);
        assert_eq!(descriptor.context_key.as_deref(), Some("greeting"));
    }
}
