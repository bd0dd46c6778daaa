//! Lifecycle events emitted as each step moves through the executor (§4.3).
//!
//! Modeled on the teacher's `ActionCommander::log`/`event` pairing: every state
//! transition is both traced and handed to an [`InvocationEmitter`] so a host can
//! forward it to its own telemetry without depending on `tracing` directly.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPhase {
    Requested,
    Started,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct InvocationEvent {
    pub step_id: String,
    pub action_id: String,
    pub phase: InvocationPhase,
    pub attempt: u32,
    pub detail: Value,
}

/// Receives lifecycle events as they occur. The default `tracing`-based emitter is
/// [`TracingEmitter`]; hosts may supply their own to forward events elsewhere.
pub trait InvocationEmitter: Send + Sync {
    fn emit(&self, event: InvocationEvent);
}

/// Emits every event through `tracing`, at `info` for normal transitions and `warn`
/// for failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl InvocationEmitter for TracingEmitter {
    fn emit(&self, event: InvocationEvent) {
        match event.phase {
            InvocationPhase::Failed => tracing::warn!(
                step_id = %event.step_id,
                action_id = %event.action_id,
                attempt = event.attempt,
                detail = %event.detail,
                "action.invocation.failed"
            ),
            InvocationPhase::Requested => tracing::info!(
                step_id = %event.step_id,
                action_id = %event.action_id,
                "action.invocation.requested"
            ),
            InvocationPhase::Started => tracing::info!(
                step_id = %event.step_id,
                action_id = %event.action_id,
                attempt = event.attempt,
                "action.invocation.started"
            ),
            InvocationPhase::Succeeded => tracing::info!(
                step_id = %event.step_id,
                action_id = %event.action_id,
                attempt = event.attempt,
                "action.invocation.succeeded"
            ),
        }
    }
}

/// An emitter that records events in memory, useful in tests and demos.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    events: std::sync::Arc<std::sync::Mutex<Vec<InvocationEvent>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InvocationEvent> {
        self.events.lock().expect("recording emitter lock poisoned").clone()
    }
}

impl InvocationEmitter for RecordingEmitter {
    fn emit(&self, event: InvocationEvent) {
        self.events.lock().expect("recording emitter lock poisoned").push(event);
    }
}
