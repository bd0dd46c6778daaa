//! Builds an execution DAG from resolved actions and computes a deterministic
//! topological order via Kahn's algorithm (§4.2).
//!
//! Edges come from two sources: explicit `dependsOn` entries on a step, and implicit
//! edges derived from `producesContext`/`requiresContext` overlap across actions.
//! Ties are always broken by the actions' original submission order, never by cost
//! or priority, so the same plan always schedules the same way.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::metadata::ActionMetadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyReason {
    Explicit,
    Context(String),
}

#[derive(Debug, Clone)]
pub struct DependencyEdge {
    /// The step that must complete before the owning node may run.
    pub target_step_id: String,
    pub reasons: Vec<DependencyReason>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub step_id: String,
    pub metadata: ActionMetadata,
    pub dependency_edges: Vec<DependencyEdge>,
    /// 1-based position in the computed execution order.
    pub order_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionDag {
    pub nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl ExecutionDag {
    pub fn get(&self, step_id: &str) -> Option<&Node> {
        self.index.get(step_id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagBuildError {
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),
    #[error("a step has an empty step id")]
    InvalidStepId,
    #[error("step '{0}' depends on unknown step '{1}'")]
    UnknownDependency(String, String),
    #[error("step '{0}' depends on itself")]
    SelfDependency(String),
    #[error("explicit dependency from '{0}' on '{1}' contradicts the context data flow")]
    ContextContradiction(String, String),
    #[error("cycle detected among steps: {0:?}")]
    CycleDetected(Vec<String>),
}

/// Builds and topologically orders the DAG for `actions`, in their submission order.
pub fn build_dag(actions: &[ActionMetadata]) -> Result<ExecutionDag, DagBuildError> {
    let mut index_of: HashMap<String, usize> = HashMap::with_capacity(actions.len());
    for (i, action) in actions.iter().enumerate() {
        if action.step_id.trim().is_empty() {
            return Err(DagBuildError::InvalidStepId);
        }
        if index_of.insert(action.step_id.clone(), i).is_some() {
            return Err(DagBuildError::DuplicateStepId(action.step_id.clone()));
        }
    }

    let mut producers: HashMap<&str, Vec<&str>> = HashMap::new();
    for action in actions {
        for key in &action.produces_context {
            producers.entry(key.as_str()).or_default().push(action.step_id.as_str());
        }
    }

    let mut edges_by_step: HashMap<String, Vec<DependencyEdge>> = HashMap::with_capacity(actions.len());
    for action in actions {
        let mut combined: HashMap<String, Vec<DependencyReason>> = HashMap::new();

        for dep in &action.depends_on {
            if dep == &action.step_id {
                return Err(DagBuildError::SelfDependency(action.step_id.clone()));
            }
            let Some(&dep_index) = index_of.get(dep) else {
                return Err(DagBuildError::UnknownDependency(action.step_id.clone(), dep.clone()));
            };
            let dependency = &actions[dep_index];
            let contradicts = action.produces_context.iter().any(|key| dependency.requires_context.contains(key));
            if contradicts {
                return Err(DagBuildError::ContextContradiction(action.step_id.clone(), dep.clone()));
            }
            combined.entry(dep.clone()).or_default().push(DependencyReason::Explicit);
        }

        for key in &action.requires_context {
            if let Some(producer_ids) = producers.get(key.as_str()) {
                for &producer_id in producer_ids {
                    if producer_id == action.step_id {
                        continue;
                    }
                    combined.entry(producer_id.to_string()).or_default().push(DependencyReason::Context(key.clone()));
                }
            }
        }

        let edges = combined.into_iter().map(|(target_step_id, reasons)| DependencyEdge { target_step_id, reasons }).collect();
        edges_by_step.insert(action.step_id.clone(), edges);
    }

    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(actions.len());
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for action in actions {
        let edges = &edges_by_step[&action.step_id];
        in_degree.insert(action.step_id.as_str(), edges.len());
        for edge in edges {
            successors.entry(edge.target_step_id.as_str()).or_default().push(action.step_id.as_str());
        }
    }

    let mut queue: VecDeque<&str> = actions.iter().map(|a| a.step_id.as_str()).filter(|id| in_degree[id] == 0).collect();

    let mut nodes = Vec::with_capacity(actions.len());
    let mut emitted: HashSet<&str> = HashSet::with_capacity(actions.len());
    let mut order_index = 1usize;

    while let Some(step_id) = queue.pop_front() {
        if !emitted.insert(step_id) {
            continue;
        }
        let action = &actions[index_of[step_id]];
        nodes.push(Node {
            step_id: step_id.to_string(),
            metadata: action.clone(),
            dependency_edges: edges_by_step[step_id].clone(),
            order_index,
        });
        order_index += 1;

        if let Some(succs) = successors.get(step_id) {
            // Walk successors in original submission order for deterministic ties.
            for candidate in actions.iter().map(|a| a.step_id.as_str()) {
                if !succs.contains(&candidate) {
                    continue;
                }
                let degree = in_degree.get_mut(candidate).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(candidate);
                }
            }
        }
    }

    if nodes.len() < actions.len() {
        let leftover: Vec<String> = actions.iter().map(|a| a.step_id.clone()).filter(|id| !emitted.contains(id.as_str())).collect();
        return Err(DagBuildError::CycleDetected(leftover));
    }

    let index = nodes.iter().enumerate().map(|(i, n)| (n.step_id.clone(), i)).collect();
    Ok(ExecutionDag { nodes, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Mutability;

    fn action(step_id: &str, requires: &[&str], produces: &[&str], depends_on: &[&str]) -> ActionMetadata {
        ActionMetadata {
            step_id: step_id.to_string(),
            action_name: step_id.to_string(),
            affinity_ids: vec![],
            mutability: Mutability::ReadOnly,
            resource_reads: vec![],
            resource_writes: vec![],
            requires_context: requires.iter().map(|s| s.to_string()).collect(),
            produces_context: produces.iter().map(|s| s.to_string()).collect(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            cost: 1,
            priority: 0,
            timeout: None,
            max_retries: 0,
            idempotent: false,
        }
    }

    #[test]
    fn context_flow_reorders_steps_declared_out_of_order() {
        let actions = vec![action("step-0", &["customer"], &[], &[]), action("step-1", &[], &["customer"], &[])];
        let dag = build_dag(&actions).unwrap();
        assert_eq!(dag.get("step-1").unwrap().order_index, 1);
        assert_eq!(dag.get("step-0").unwrap().order_index, 2);
    }

    #[test]
    fn independent_steps_keep_submission_order() {
        let actions = vec![action("a", &[], &[], &[]), action("b", &[], &[], &[])];
        let dag = build_dag(&actions).unwrap();
        assert_eq!(dag.get("a").unwrap().order_index, 1);
        assert_eq!(dag.get("b").unwrap().order_index, 2);
    }

    #[test]
    fn self_dependency_is_rejected() {
        let actions = vec![action("a", &[], &[], &["a"])];
        assert_eq!(build_dag(&actions).unwrap_err(), DagBuildError::SelfDependency("a".into()));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let actions = vec![action("a", &[], &[], &["ghost"])];
        assert_eq!(build_dag(&actions).unwrap_err(), DagBuildError::UnknownDependency("a".into(), "ghost".into()));
    }

    #[test]
    fn duplicate_step_id_is_rejected() {
        let actions = vec![action("a", &[], &[], &[]), action("a", &[], &[], &[])];
        assert_eq!(build_dag(&actions).unwrap_err(), DagBuildError::DuplicateStepId("a".into()));
    }

    #[test]
    fn cycle_is_detected() {
        let actions = vec![action("a", &["y"], &["x"], &[]), action("b", &["x"], &["y"], &[])];
        match build_dag(&actions).unwrap_err() {
            DagBuildError::CycleDetected(mut steps) => {
                steps.sort();
                assert_eq!(steps, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn explicit_dependency_contradicting_context_flow_is_rejected() {
        // b produces "x", which a requires; a cannot ALSO explicitly depend on b
        // being downstream of a via a dependsOn edge pointing the other way.
        let actions = vec![action("a", &["x"], &["y"], &["b"]), action("b", &["y"], &["x"], &[])];
        assert_eq!(build_dag(&actions).unwrap_err(), DagBuildError::ContextContradiction("a".into(), "b".into()));
    }
}
