//! Runs a lowered plan's DAG in topological order, applying per-step timeout,
//! retry, and idempotence policy, and emitting lifecycle events at each
//! transition (§4.3, §5).
//!
//! The default executor is strictly sequential: the DAG's `order_index` is a total
//! order, not merely a partial one, so steps with no dependency between them still
//! run one at a time, in the order the scheduler assigned. Parallelizing
//! independent steps is future work; `resourceReads`/`resourceWrites` on
//! `ActionMetadata` exist in anticipation of it but are not consulted here.

use std::time::{Duration, Instant};

use serde_json::Value;
use sxl_planner::{ActionRegistry, ArgumentBinder, BoundArgument, ExecutionContext, Plan};
use tokio::sync::watch;

use crate::error::{ActionError, ExecutionError};
use crate::events::{InvocationEmitter, InvocationEvent, InvocationPhase, TracingEmitter};
use crate::host::HostActionRegistry;
use crate::retry::RetryPolicy;

/// Outcome of running one step to completion (or exhausting its retries).
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step_id: String,
    pub action_id: String,
    pub attempts: u32,
    pub result: Result<Option<Value>, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<StepOutcome>,
}

pub struct Executor {
    action_registry: ActionRegistry,
    host_actions: HostActionRegistry,
    binder: ArgumentBinder,
    emitter: Box<dyn InvocationEmitter>,
    default_timeout: Duration,
}

impl Executor {
    pub fn new(action_registry: ActionRegistry, host_actions: HostActionRegistry, binder: ArgumentBinder) -> Self {
        Self { action_registry, host_actions, binder, emitter: Box::new(TracingEmitter), default_timeout: Duration::from_secs(30) }
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: Box<dyn InvocationEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Executes `plan` to completion, or until a step exhausts its retries, a
    /// step's timeout elapses, or `cancel` flips to `true`.
    pub async fn execute(&self, plan: &Plan, cancel: watch::Receiver<bool>) -> Result<(ExecutionContext, ExecutionReport), ExecutionError> {
        let (actions, dag) = sxl_planner::lower_plan(&self.action_registry, plan)?;

        let context = ExecutionContext::new();
        let mut report = ExecutionReport::default();

        for node in &dag.nodes {
            if *cancel.borrow() {
                return Err(ExecutionError::Cancelled { step_id: node.step_id.clone() });
            }

            let action = actions
                .iter()
                .find(|a| a.metadata.step_id == node.step_id)
                .expect("DAG node must correspond to a lowered action");

            let host_action = self.host_actions.get(&action.descriptor.id).cloned().ok_or_else(|| ExecutionError::UnregisteredAction {
                step_id: node.step_id.clone(),
                action_id: action.descriptor.id.clone(),
            })?;

            let bound = self.binder.bind(&action.descriptor.id, &action.descriptor.parameters, &action.parameters, &context);
            let failures: Vec<String> = bound
                .iter()
                .filter_map(|b| match b {
                    BoundArgument::Failure { errors, .. } => Some(errors.join("; ")),
                    BoundArgument::Success { .. } => None,
                })
                .collect();
            if !failures.is_empty() {
                return Err(ExecutionError::BindingFailed { step_id: node.step_id.clone(), count: failures.len(), errors: failures });
            }

            let policy = RetryPolicy::new(node.metadata.max_retries);
            let timeout = node.metadata.timeout.unwrap_or(self.default_timeout);
            let mut attempt = 0u32;

            let result = loop {
                attempt += 1;
                self.emitter.emit(InvocationEvent {
                    step_id: node.step_id.clone(),
                    action_id: action.descriptor.id.clone(),
                    phase: InvocationPhase::Requested,
                    attempt,
                    detail: Value::Null,
                });
                self.emitter.emit(InvocationEvent {
                    step_id: node.step_id.clone(),
                    action_id: action.descriptor.id.clone(),
                    phase: InvocationPhase::Started,
                    attempt,
                    detail: Value::Null,
                });

                let started_at = Instant::now();
                let invocation = tokio::time::timeout(timeout, host_action.invoke(&bound, &context)).await;

                match invocation {
                    Err(_) => {
                        let elapsed_ms = started_at.elapsed().as_millis();
                        if attempt <= node.metadata.max_retries && node.metadata.idempotent {
                            tokio::time::sleep(policy.backoff_delay(attempt)).await;
                            continue;
                        }
                        break Err(ExecutionError::Timeout { step_id: node.step_id.clone(), elapsed_ms });
                    }
                    Ok(Ok(value)) => {
                        self.emitter.emit(InvocationEvent {
                            step_id: node.step_id.clone(),
                            action_id: action.descriptor.id.clone(),
                            phase: InvocationPhase::Succeeded,
                            attempt,
                            detail: Value::Null,
                        });
                        break Ok(value);
                    }
                    Ok(Err(action_error)) => {
                        self.emitter.emit(InvocationEvent {
                            step_id: node.step_id.clone(),
                            action_id: action.descriptor.id.clone(),
                            phase: InvocationPhase::Failed,
                            attempt,
                            detail: Value::String(action_error.message.clone()),
                        });
                        let retryable = action_error.transient && node.metadata.idempotent && attempt <= node.metadata.max_retries;
                        if retryable {
                            tokio::time::sleep(policy.backoff_delay(attempt)).await;
                            continue;
                        }
                        break Err(ExecutionError::StepFailed { step_id: node.step_id.clone(), attempts: attempt, source: action_error });
                    }
                }
            };

            match result {
                Ok(value) => {
                    if let (Some(key), Some(value)) = (&action.descriptor.context_key, value.clone()) {
                        context.put(key.clone(), value);
                    }

                    let missing_keys: Vec<String> =
                        node.metadata.produces_context.iter().filter(|key| !context.contains(key)).cloned().collect();
                    if !missing_keys.is_empty() {
                        let error = ExecutionError::ContractViolation {
                            step_id: node.step_id.clone(),
                            action_id: action.descriptor.id.clone(),
                            missing_keys,
                        };
                        report.outcomes.push(StepOutcome {
                            step_id: node.step_id.clone(),
                            action_id: action.descriptor.id.clone(),
                            attempts: attempt,
                            result: Err(error.to_string()),
                        });
                        return Err(error);
                    }

                    report.outcomes.push(StepOutcome {
                        step_id: node.step_id.clone(),
                        action_id: action.descriptor.id.clone(),
                        attempts: attempt,
                        result: Ok(value),
                    });
                }
                Err(error) => {
                    report.outcomes.push(StepOutcome {
                        step_id: node.step_id.clone(),
                        action_id: action.descriptor.id.clone(),
                        attempts: attempt,
                        result: Err(error.to_string()),
                    });
                    return Err(error);
                }
            }
        }

        Ok((context, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use sxl_planner::{ActionDescriptor, ParameterSpec, Plan, PlanStep};

    struct FetchCustomer;
    #[async_trait]
    impl crate::host::HostAction for FetchCustomer {
        async fn invoke(&self, _args: &[BoundArgument], _ctx: &ExecutionContext) -> Result<Option<Value>, ActionError> {
            Ok(Some(json!({"id": "c1", "name": "Ada"})))
        }
    }

    struct Greet;
    #[async_trait]
    impl crate::host::HostAction for Greet {
        async fn invoke(&self, args: &[BoundArgument], _ctx: &ExecutionContext) -> Result<Option<Value>, ActionError> {
            let customer = args[0].clone();
            match customer {
                BoundArgument::Success { value, .. } => Ok(Some(json!({"greeting": format!("hello {}", value.as_json().unwrap()["name"])}))),
                BoundArgument::Failure { .. } => Err(ActionError::permanent("missing customer")),
            }
        }
    }

    fn build_executor() -> Executor {
        let mut action_registry = ActionRegistry::new();
        action_registry
            .register(ActionDescriptor::new("fetchCustomer", "fetches a customer").with_parameter(ParameterSpec::new("id", "string")).with_context_key("customer"))
            .unwrap();
        action_registry
            .register(
                ActionDescriptor::new("greet", "greets a customer")
                    .with_parameter(ParameterSpec::new("customer", "object").with_from_context("customer")),
            )
            .unwrap();

        let mut host_actions = HostActionRegistry::new();
        host_actions.register("fetchCustomer", Arc::new(FetchCustomer));
        host_actions.register("greet", Arc::new(Greet));

        let binder = ArgumentBinder::with_default_handlers(Arc::new(sxl_grammar::GrammarRegistry::new()));
        Executor::new(action_registry, host_actions, binder)
    }

    #[tokio::test]
    async fn executes_plan_steps_in_dependency_order_despite_submission_order() {
        let executor = build_executor();
        let plan = Plan::new("greet a customer")
            .with_step(PlanStep::new("greet"))
            .with_step(PlanStep::new("fetchCustomer").with_parameters(json!({"id": "c1"})));

        let (context, report) = executor.execute(&plan, watch::channel(false).1).await.unwrap();
        assert_eq!(report.outcomes[0].action_id, "fetchCustomer");
        assert_eq!(report.outcomes[1].action_id, "greet");
        assert!(context.contains("customer"));
    }

    #[tokio::test]
    async fn cancellation_before_start_stops_execution() {
        let executor = build_executor();
        let plan = Plan::new("greet a customer").with_step(PlanStep::new("fetchCustomer").with_parameters(json!({"id": "c1"})));
        let (tx, rx) = watch::channel(true);
        let _ = tx;
        let err = executor.execute(&plan, rx).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Cancelled { .. }));
    }

    struct FlakyThenOk {
        calls: AtomicU32,
    }
    #[async_trait]
    impl crate::host::HostAction for FlakyThenOk {
        async fn invoke(&self, _args: &[BoundArgument], _ctx: &ExecutionContext) -> Result<Option<Value>, ActionError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ActionError::transient("temporary glitch"))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn transient_failure_on_an_idempotent_action_is_retried() {
        let mut action_registry = ActionRegistry::new();
        action_registry
            .register(ActionDescriptor::new("flaky", "sometimes fails").idempotent(true).with_max_retries(2))
            .unwrap();
        let mut host_actions = HostActionRegistry::new();
        host_actions.register("flaky", Arc::new(FlakyThenOk { calls: AtomicU32::new(0) }));
        let binder = ArgumentBinder::with_default_handlers(Arc::new(sxl_grammar::GrammarRegistry::new()));
        let executor = Executor::new(action_registry, host_actions, binder).with_default_timeout(Duration::from_secs(1));

        let plan = Plan::new("flaky plan").with_step(PlanStep::new("flaky"));
        let (_ctx, report) = executor.execute(&plan, watch::channel(false).1).await.unwrap();
        assert_eq!(report.outcomes[0].attempts, 2);
    }

    struct ForgetsAdditionalKey;
    #[async_trait]
    impl crate::host::HostAction for ForgetsAdditionalKey {
        async fn invoke(&self, _args: &[BoundArgument], _ctx: &ExecutionContext) -> Result<Option<Value>, ActionError> {
            Ok(Some(json!({"id": "c1"})))
        }
    }

    #[tokio::test]
    async fn missing_additional_context_key_fails_with_contract_violation() {
        let mut action_registry = ActionRegistry::new();
        action_registry
            .register(
                ActionDescriptor::new("onboard", "onboards a customer")
                    .with_context_key("customer")
                    .with_additional_context_keys(["audit_ref".to_string()]),
            )
            .unwrap();
        let mut host_actions = HostActionRegistry::new();
        host_actions.register("onboard", Arc::new(ForgetsAdditionalKey));
        let binder = ArgumentBinder::with_default_handlers(Arc::new(sxl_grammar::GrammarRegistry::new()));
        let executor = Executor::new(action_registry, host_actions, binder);

        let plan = Plan::new("onboard a customer").with_step(PlanStep::new("onboard"));
        let err = executor.execute(&plan, watch::channel(false).1).await.unwrap_err();
        match err {
            ExecutionError::ContractViolation { missing_keys, .. } => assert_eq!(missing_keys, vec!["audit_ref".to_string()]),
            other => panic!("expected ContractViolation, got {other:?}"),
        }
    }

    struct WritesAdditionalKey;
    #[async_trait]
    impl crate::host::HostAction for WritesAdditionalKey {
        async fn invoke(&self, _args: &[BoundArgument], ctx: &ExecutionContext) -> Result<Option<Value>, ActionError> {
            ctx.put("audit_ref", json!("ref-1"));
            Ok(Some(json!({"id": "c1"})))
        }
    }

    #[tokio::test]
    async fn action_writing_its_additional_context_key_satisfies_the_contract() {
        let mut action_registry = ActionRegistry::new();
        action_registry
            .register(
                ActionDescriptor::new("onboard", "onboards a customer")
                    .with_context_key("customer")
                    .with_additional_context_keys(["audit_ref".to_string()]),
            )
            .unwrap();
        let mut host_actions = HostActionRegistry::new();
        host_actions.register("onboard", Arc::new(WritesAdditionalKey));
        let binder = ArgumentBinder::with_default_handlers(Arc::new(sxl_grammar::GrammarRegistry::new()));
        let executor = Executor::new(action_registry, host_actions, binder);

        let plan = Plan::new("onboard a customer").with_step(PlanStep::new("onboard"));
        let (ctx, _report) = executor.execute(&plan, watch::channel(false).1).await.unwrap();
        assert!(ctx.contains("customer"));
        assert!(ctx.contains("audit_ref"));
    }
}
