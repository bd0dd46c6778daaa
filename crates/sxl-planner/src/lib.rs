//! sxl-planner: action registry, argument binder, plan model, shared execution
//! context, and the DAG builder that turns a submitted [`plan::Plan`] into a
//! deterministically ordered [`dag::ExecutionDag`] (§3, §4.1, §4.2).

pub mod binder;
pub mod context;
pub mod dag;
pub mod descriptor;
pub mod lower;
pub mod metadata;
pub mod plan;
pub mod registry;

pub use binder::{ArgumentBinder, BoundArgument, BoundValue, JsonKind, JsonTypeHandler, TypeHandler, EXECUTION_CONTEXT_TYPE_ID};
pub use context::{ContextError, ExecutionContext};
pub use dag::{build_dag, DagBuildError, DependencyEdge, DependencyReason, ExecutionDag, Node};
pub use descriptor::{ActionDescriptor, Mutability, ParameterSpec};
pub use lower::{lower_plan, LowerError};
pub use metadata::{build_executable_action, flatten_params, resolve_templates, ActionMetadata, BuildError, ExecutableAction};
pub use plan::{Plan, PlanStep};
pub use registry::{ActionRegistry, RegistryError};
