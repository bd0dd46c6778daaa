//! Per-executable metadata the DAG builder and executor consume (§3, §4.2).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{ActionDescriptor, Mutability};
use crate::plan::PlanStep;
use crate::registry::{ActionRegistry, RegistryError};

/// Flattens a JSON value into dotted-path string lookups, e.g.
/// `{"customer": {"id": "c1"}}` becomes `{"customer.id": "c1"}`.
pub fn flatten_params(value: &Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                flatten_into(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}[{index}]"), child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Null => {
            out.insert(prefix.to_string(), "null".to_string());
        }
    }
}

/// Resolves `{dotted.path}` templates against a flattened parameter map.
/// A template referencing a path absent from the flattened map is left unresolved.
pub fn resolve_templates(templates: &[String], flattened: &HashMap<String, String>) -> Vec<String> {
    templates
        .iter()
        .map(|template| {
            let mut resolved = template.clone();
            for (path, value) in flattened {
                resolved = resolved.replace(&format!("{{{path}}}"), value);
            }
            resolved
        })
        .collect()
}

/// Scheduling-relevant metadata for one executable action, built once when a
/// [`PlanStep`] is resolved against its [`ActionDescriptor`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMetadata {
    pub step_id: String,
    pub action_name: String,
    pub affinity_ids: Vec<String>,
    pub mutability: Mutability,
    pub resource_reads: Vec<String>,
    pub resource_writes: Vec<String>,
    pub requires_context: Vec<String>,
    pub produces_context: Vec<String>,
    pub depends_on: Vec<String>,
    pub cost: u32,
    /// Scheduling tie-break hint; the default scheduler ignores this and relies
    /// solely on insertion order (§4.2 Open Question).
    pub priority: i32,
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    pub idempotent: bool,
}

/// A fully resolved unit of work: its static descriptor, its per-step metadata, and
/// the raw JSON parameters the binder will bind against the descriptor's parameters.
#[derive(Debug, Clone)]
pub struct ExecutableAction {
    pub descriptor: ActionDescriptor,
    pub metadata: ActionMetadata,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Resolves one [`PlanStep`] against the registry, producing its [`ExecutableAction`].
///
/// `index` is the step's 0-based position in the submitted plan, used to generate a
/// `step-{index}` id when the step does not supply its own.
pub fn build_executable_action(registry: &ActionRegistry, step: &PlanStep, index: usize) -> Result<ExecutableAction, BuildError> {
    let descriptor = registry.lookup(&step.action_id)?.clone();
    let step_id = step.step_id.clone().unwrap_or_else(|| format!("step-{index}"));
    let flattened = flatten_params(&step.parameters);

    let affinity_ids = resolve_templates(&descriptor.affinities, &flattened);
    let resource_reads = resolve_templates(&descriptor.resource_reads, &flattened);
    let resource_writes = resolve_templates(&descriptor.resource_writes, &flattened);

    let requires_context: Vec<String> = descriptor.parameters.iter().filter_map(|p| p.from_context.clone()).collect();

    let mut produces_context: Vec<String> = descriptor.context_key.clone().into_iter().collect();
    produces_context.extend(descriptor.additional_context_keys.iter().cloned());

    let metadata = ActionMetadata {
        step_id,
        action_name: descriptor.id.clone(),
        affinity_ids,
        mutability: descriptor.mutability,
        resource_reads,
        resource_writes,
        requires_context,
        produces_context,
        depends_on: step.depends_on.clone(),
        cost: descriptor.cost,
        priority: 0,
        timeout: descriptor.timeout,
        max_retries: descriptor.max_retries,
        idempotent: descriptor.idempotent,
    };

    Ok(ExecutableAction { descriptor, metadata, description: step.description.clone(), parameters: step.parameters.clone() })
}
