//! Lowers a submitted [`Plan`] into its resolved [`ExecutableAction`]s, and those into
//! a built [`ExecutionDag`] — the bridge between the wire plan model and scheduling.

use crate::dag::{build_dag, DagBuildError, ExecutionDag};
use crate::metadata::{build_executable_action, BuildError, ExecutableAction};
use crate::plan::Plan;
use crate::registry::ActionRegistry;

#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    #[error("step {index}: {source}")]
    Build { index: usize, #[source] source: BuildError },
    #[error(transparent)]
    Dag(#[from] DagBuildError),
}

/// Resolves every step of `plan` against `registry`, then builds and orders the DAG.
pub fn lower_plan(registry: &ActionRegistry, plan: &Plan) -> Result<(Vec<ExecutableAction>, ExecutionDag), LowerError> {
    let mut actions = Vec::with_capacity(plan.steps.len());
    for (index, step) in plan.steps.iter().enumerate() {
        let action = build_executable_action(registry, step, index).map_err(|source| LowerError::Build { index, source })?;
        actions.push(action);
    }

    let metadata: Vec<_> = actions.iter().map(|a| a.metadata.clone()).collect();
    let dag = build_dag(&metadata)?;
    Ok((actions, dag))
}
