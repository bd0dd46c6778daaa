//! The wire-level plan model an LLM (or any caller) submits (§6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a submitted plan.
///
/// `step_id` and `depends_on` are not part of the minimal wire example in §6 but are
/// accepted when present; when `step_id` is absent the planner assigns `step-{index}`
/// (0-based, in submission order) so every [`crate::metadata::ActionMetadata`] still
/// gets a unique id (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub action_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_parameters")]
    pub parameters: Value,
    #[serde(default)]
    pub step_id: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn default_parameters() -> Value {
    Value::Object(serde_json::Map::new())
}

impl PlanStep {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            description: String::new(),
            parameters: default_parameters(),
            step_id: None,
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_step_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    #[must_use]
    pub fn depending_on(mut self, step_ids: impl IntoIterator<Item = String>) -> Self {
        self.depends_on.extend(step_ids);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub message: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), steps: Vec::new() }
    }

    #[must_use]
    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_minimal_wire_shape() {
        let raw = r#"{
            "message": "booking a flight",
            "steps": [
                { "actionId": "searchFlights", "description": "find flights", "parameters": {"from": "SFO"} }
            ]
        }"#;
        let plan: Plan = serde_json::from_str(raw).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action_id, "searchFlights");
        assert!(plan.steps[0].step_id.is_none());
    }
}
