//! The trait a host implements to make an `ActionDescriptor` actually runnable,
//! and the registry mapping action ids to their implementations (§3, §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sxl_planner::{BoundArgument, ExecutionContext};

use crate::error::ActionError;

/// The host-side implementation behind one registered `ActionDescriptor`.
///
/// `args` carries one [`BoundArgument`] per parameter, in declaration order, exactly
/// as produced by [`sxl_planner::ArgumentBinder::bind`]. Returning `Ok(None)` means
/// the action produced no context value; `Ok(Some(value))` is stored under the
/// descriptor's `contextKey` by the executor after the call returns.
///
/// If the descriptor declares `additionalContextKeys`, the action is responsible for
/// writing those itself via `context.put` before returning — they are not derived
/// from the return value. The executor verifies after the call that every key in
/// `producesContext` (primary + additional) is present, failing the step with
/// `ContractViolation` otherwise (§4.3).
#[async_trait]
pub trait HostAction: Send + Sync {
    async fn invoke(&self, args: &[BoundArgument], context: &ExecutionContext) -> Result<Option<Value>, ActionError>;
}

#[derive(Default)]
pub struct HostActionRegistry {
    actions: HashMap<String, Arc<dyn HostAction>>,
}

impl HostActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action_id: impl Into<String>, action: Arc<dyn HostAction>) {
        self.actions.insert(action_id.into(), action);
    }

    pub fn get(&self, action_id: &str) -> Option<&Arc<dyn HostAction>> {
        self.actions.get(action_id)
    }
}
