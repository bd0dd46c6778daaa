//! End-to-end run of the two-step context-dataflow scenario: a plan submits
//! `greet` before `fetchCustomer`, even though `greet` needs the value
//! `fetchCustomer` produces. The DAG builder reorders them by context flow
//! alone — no explicit `dependsOn` is given.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use sxl_engine::exec::{Executor, HostAction, HostActionRegistry};
use sxl_engine::grammar::GrammarRegistry;
use sxl_engine::planner::{ActionDescriptor, ActionRegistry, ArgumentBinder, BoundArgument, ExecutionContext, ParameterSpec, Plan, PlanStep};
use tokio::sync::watch;

struct FetchCustomer;

#[async_trait]
impl HostAction for FetchCustomer {
    async fn invoke(&self, args: &[BoundArgument], _context: &ExecutionContext) -> Result<Option<Value>, sxl_engine::exec::ActionError> {
        let id = args
            .iter()
            .find(|a| a.name() == "id")
            .and_then(|a| match a {
                BoundArgument::Success { value, .. } => value.as_json().and_then(Value::as_str),
                BoundArgument::Failure { .. } => None,
            })
            .unwrap_or("unknown");

        Ok(Some(json!({"id": id, "name": "Ada Lovelace"})))
    }
}

struct Greet;

#[async_trait]
impl HostAction for Greet {
    async fn invoke(&self, args: &[BoundArgument], _context: &ExecutionContext) -> Result<Option<Value>, sxl_engine::exec::ActionError> {
        let customer = args.first().ok_or_else(|| sxl_engine::exec::ActionError::permanent("missing customer argument"))?;
        let name = match customer {
            BoundArgument::Success { value, .. } => value
                .as_json()
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| sxl_engine::exec::ActionError::permanent("customer has no name"))?,
            BoundArgument::Failure { errors, .. } => return Err(sxl_engine::exec::ActionError::permanent(errors.join("; "))),
        };
        Ok(Some(json!({"greeting": format!("Hello, {name}")})))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let mut action_registry = ActionRegistry::new();
    action_registry.register(
        ActionDescriptor::new("fetchCustomer", "fetches a customer record by id")
            .with_parameter(ParameterSpec::new("id", "string"))
            .with_context_key("customer")
            .idempotent(true),
    )?;
    action_registry.register(
        ActionDescriptor::new("greet", "greets a customer by name")
            .with_parameter(ParameterSpec::new("customer", "object").with_from_context("customer"))
            .with_context_key("greeting"),
    )?;

    let mut host_actions = HostActionRegistry::new();
    host_actions.register("fetchCustomer", Arc::new(FetchCustomer));
    host_actions.register("greet", Arc::new(Greet));

    let binder = ArgumentBinder::with_default_handlers(Arc::new(GrammarRegistry::new()));
    let executor = Executor::new(action_registry, host_actions, binder);

    // Submitted out of dependency order on purpose: greet first, fetchCustomer second.
    let plan = Plan::new("greet a returning customer")
        .with_step(PlanStep::new("greet").with_description("say hello"))
        .with_step(PlanStep::new("fetchCustomer").with_description("look up the customer").with_parameters(json!({"id": "c-42"})));

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let (context, report) = executor.execute(&plan, cancel_rx).await?;

    for outcome in &report.outcomes {
        println!("{} ({}): {:?}", outcome.step_id, outcome.action_id, outcome.result);
    }

    let greeting: Value = context.get("greeting")?;
    println!("final greeting: {greeting}");
    Ok(())
}
