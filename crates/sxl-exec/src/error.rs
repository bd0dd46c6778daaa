//! Error types raised by a [`crate::executor::Executor`] (§4.3, §5).

use thiserror::Error;

/// A host-raised failure from inside a [`crate::host::HostAction::invoke`] call.
///
/// `transient` controls whether the executor's retry policy applies; an action
/// marked non-idempotent is never retried regardless of this flag (§5).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
    pub transient: bool,
}

impl ActionError {
    pub fn permanent(message: impl Into<String>) -> Self {
        Self { message: message.into(), transient: false }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self { message: message.into(), transient: true }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("plan could not be lowered: {0}")]
    Lower(#[from] sxl_planner::LowerError),
    #[error("step '{step_id}' has no registered host action for '{action_id}'")]
    UnregisteredAction { step_id: String, action_id: String },
    #[error("step '{step_id}' failed to bind {count} argument(s): {errors:?}")]
    BindingFailed { step_id: String, count: usize, errors: Vec<String> },
    #[error("step '{step_id}' timed out after {elapsed_ms}ms")]
    Timeout { step_id: String, elapsed_ms: u128 },
    #[error("step '{step_id}' failed after {attempts} attempt(s): {source}")]
    StepFailed { step_id: String, attempts: u32, #[source] source: ActionError },
    #[error("execution cancelled before step '{step_id}' started")]
    Cancelled { step_id: String },
    #[error("step '{step_id}' ('{action_id}') did not honor its context contract: missing key(s) {missing_keys:?}")]
    ContractViolation { step_id: String, action_id: String, missing_keys: Vec<String> },
}
