//! sxl-exec: the executor. Runs a lowered plan's DAG with per-step retry, timeout,
//! idempotence handling, cooperative cancellation, and lifecycle events (§4.3, §5).

pub mod error;
pub mod events;
pub mod executor;
pub mod host;
pub mod retry;

pub use error::{ActionError, ExecutionError};
pub use events::{InvocationEmitter, InvocationEvent, InvocationPhase, RecordingEmitter, TracingEmitter};
pub use executor::{ExecutionReport, Executor, StepOutcome};
pub use host::{HostAction, HostActionRegistry};
pub use retry::RetryPolicy;
