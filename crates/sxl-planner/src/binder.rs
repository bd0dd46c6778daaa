//! Argument binding: turns a step's JSON parameters into host-typed values (§4.1).
//!
//! Binding order for each parameter:
//! 1. `fromContext` set → resolve from the [`ExecutionContext`], `MissingContext` on miss.
//! 2. `typeId == "ExecutionContext"` → inject the active context directly.
//! 3. `dslId` set → the JSON value must be a string of SXL source; parse and validate
//!    it against the named grammar before handing back the `Program`.
//! 4. Otherwise → look up a registered [`TypeHandler`] for `typeId` and convert the
//!    step's JSON value.
//!
//! Each parameter binds independently; one failure does not short-circuit the rest,
//! so a caller can report every problem in a submitted plan at once.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use sxl_grammar::GrammarRegistry;
use sxl_syntax::ast::Program;
use sxl_syntax::parser::parse_program;

use crate::context::ExecutionContext;
use crate::descriptor::ParameterSpec;

/// A value produced by binding, tagged by how it was produced.
#[derive(Debug, Clone)]
pub enum BoundValue {
    Json(Value),
    SxlProgram(Program),
    Context(ExecutionContext),
}

impl BoundValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            BoundValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_sxl_program(&self) -> Option<&Program> {
        match self {
            BoundValue::SxlProgram(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&ExecutionContext> {
        match self {
            BoundValue::Context(c) => Some(c),
            _ => None,
        }
    }
}

/// The per-parameter binding outcome (§4.1's Success/Failure tagged union).
#[derive(Debug, Clone)]
pub enum BoundArgument {
    Success { name: String, value: BoundValue },
    Failure { name: String, errors: Vec<String>, raw: Option<Value> },
}

impl BoundArgument {
    pub fn is_success(&self) -> bool {
        matches!(self, BoundArgument::Success { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            BoundArgument::Success { name, .. } | BoundArgument::Failure { name, .. } => name,
        }
    }
}

/// Converts a parameter's raw JSON value into a host-typed [`BoundValue`].
///
/// Registered per `typeId`; the binder falls back to `UnknownTypeHandler` when no
/// handler covers a parameter's declared type.
pub trait TypeHandler: Send + Sync {
    fn type_id(&self) -> &str;
    fn convert(&self, raw: &Value) -> Result<BoundValue, String>;
}

#[derive(Debug, Clone, Copy)]
pub enum JsonKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Boolean => "boolean",
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// Passthrough handler for plain JSON parameter types, with a lightweight kind check.
pub struct JsonTypeHandler {
    type_id: String,
    kind: JsonKind,
}

impl JsonTypeHandler {
    pub fn new(type_id: impl Into<String>, kind: JsonKind) -> Self {
        Self { type_id: type_id.into(), kind }
    }
}

impl TypeHandler for JsonTypeHandler {
    fn type_id(&self) -> &str {
        &self.type_id
    }

    fn convert(&self, raw: &Value) -> Result<BoundValue, String> {
        let ok = match self.kind {
            JsonKind::String => raw.is_string(),
            JsonKind::Number => raw.is_number(),
            JsonKind::Boolean => raw.is_boolean(),
            JsonKind::Object => raw.is_object(),
            JsonKind::Array => raw.is_array(),
            JsonKind::Any => true,
        };
        if ok {
            Ok(BoundValue::Json(raw.clone()))
        } else {
            Err(format!("expected a {}, found {raw}", self.kind))
        }
    }
}

pub const EXECUTION_CONTEXT_TYPE_ID: &str = "ExecutionContext";

pub struct ArgumentBinder {
    handlers: HashMap<String, Arc<dyn TypeHandler>>,
    grammars: Arc<GrammarRegistry>,
}

impl ArgumentBinder {
    pub fn new(grammars: Arc<GrammarRegistry>) -> Self {
        Self { handlers: HashMap::new(), grammars }
    }

    /// A binder preloaded with handlers for the plain JSON scalar/container types.
    pub fn with_default_handlers(grammars: Arc<GrammarRegistry>) -> Self {
        let mut binder = Self::new(grammars);
        for (type_id, kind) in [
            ("string", JsonKind::String),
            ("number", JsonKind::Number),
            ("boolean", JsonKind::Boolean),
            ("object", JsonKind::Object),
            ("array", JsonKind::Array),
            ("any", JsonKind::Any),
        ] {
            binder.register_handler(Arc::new(JsonTypeHandler::new(type_id, kind)));
        }
        binder
    }

    pub fn register_handler(&mut self, handler: Arc<dyn TypeHandler>) {
        self.handlers.insert(handler.type_id().to_string(), handler);
    }

    /// Binds every parameter of `parameters` against a step's JSON `args` and the
    /// shared `context`. Always returns one [`BoundArgument`] per parameter, in order.
    pub fn bind(&self, action_id: &str, parameters: &[ParameterSpec], args: &Value, context: &ExecutionContext) -> Vec<BoundArgument> {
        parameters.iter().map(|p| self.bind_one(action_id, p, args, context)).collect()
    }

    fn bind_one(&self, action_id: &str, param: &ParameterSpec, args: &Value, context: &ExecutionContext) -> BoundArgument {
        if let Some(key) = &param.from_context {
            return match context.get::<Value>(key) {
                Ok(value) => BoundArgument::Success { name: param.name.clone(), value: BoundValue::Json(value) },
                Err(_) => BoundArgument::Failure {
                    name: param.name.clone(),
                    errors: vec![format!("action '{action_id}' requires context key '{key}' for parameter '{}'", param.name)],
                    raw: None,
                },
            };
        }

        if param.type_id == EXECUTION_CONTEXT_TYPE_ID {
            return BoundArgument::Success { name: param.name.clone(), value: BoundValue::Context(context.clone()) };
        }

        let Some(raw) = args.get(&param.name) else {
            return BoundArgument::Failure {
                name: param.name.clone(),
                errors: vec![format!("missing required argument '{}' for action '{action_id}'", param.name)],
                raw: None,
            };
        };

        self.convert(action_id, param, raw)
    }

    fn convert(&self, action_id: &str, param: &ParameterSpec, raw: &Value) -> BoundArgument {
        if let Some(dsl_id) = &param.dsl_id {
            return self.convert_dsl(param, dsl_id, raw);
        }

        match self.handlers.get(&param.type_id) {
            Some(handler) => match handler.convert(raw) {
                Ok(value) => BoundArgument::Success { name: param.name.clone(), value },
                Err(error) => BoundArgument::Failure { name: param.name.clone(), errors: vec![error], raw: Some(raw.clone()) },
            },
            None => BoundArgument::Failure {
                name: param.name.clone(),
                errors: vec![format!(
                    "no type handler registered for type '{}' (action '{action_id}', parameter '{}')",
                    param.type_id, param.name
                )],
                raw: Some(raw.clone()),
            },
        }
    }

    fn convert_dsl(&self, param: &ParameterSpec, dsl_id: &str, raw: &Value) -> BoundArgument {
        let Some(text) = raw.as_str() else {
            return BoundArgument::Failure {
                name: param.name.clone(),
                errors: vec![format!("parameter '{}' expects SXL source as a string", param.name)],
                raw: Some(raw.clone()),
            };
        };

        let program = match parse_program(text) {
            Ok(program) => program,
            Err(error) => {
                return BoundArgument::Failure { name: param.name.clone(), errors: vec![error.to_string()], raw: Some(raw.clone()) }
            }
        };

        let Some(grammar) = self.grammars.lookup(dsl_id) else {
            return BoundArgument::Failure {
                name: param.name.clone(),
                errors: vec![format!("unknown DSL '{dsl_id}' referenced by parameter '{}'", param.name)],
                raw: Some(raw.clone()),
            };
        };

        let diagnostics = sxl_grammar::validate_program(&program, grammar, &self.grammars);
        if diagnostics.iter().any(|d| d.severity == sxl_syntax::diagnostics::Severity::Error) {
            return BoundArgument::Failure {
                name: param.name.clone(),
                errors: diagnostics.into_iter().map(|d| d.message).collect(),
                raw: Some(raw.clone()),
            };
        }

        BoundArgument::Success { name: param.name.clone(), value: BoundValue::SxlProgram(program) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sxl_grammar::GrammarRegistry;

    fn binder() -> ArgumentBinder {
        ArgumentBinder::with_default_handlers(Arc::new(GrammarRegistry::new()))
    }

    #[test]
    fn missing_required_argument_fails() {
        let params = vec![ParameterSpec::new("name", "string")];
        let result = binder().bind("greet", &params, &json!({}), &ExecutionContext::new());
        assert!(!result[0].is_success());
    }

    #[test]
    fn from_context_resolves_from_the_shared_context() {
        let params = vec![ParameterSpec::new("customer", "object").with_from_context("customer")];
        let context = ExecutionContext::new();
        context.put("customer", json!({"id": "c1"}));
        let result = binder().bind("greet", &params, &json!({}), &context);
        assert!(result[0].is_success());
    }

    #[test]
    fn from_context_miss_fails_with_named_key() {
        let params = vec![ParameterSpec::new("customer", "object").with_from_context("customer")];
        let result = binder().bind("greet", &params, &json!({}), &ExecutionContext::new());
        match &result[0] {
            BoundArgument::Failure { errors, .. } => assert!(errors[0].contains("customer")),
            BoundArgument::Success { .. } => panic!("expected a failure"),
        }
    }

    #[test]
    fn execution_context_type_is_injected_directly() {
        let params = vec![ParameterSpec::new("ctx", EXECUTION_CONTEXT_TYPE_ID)];
        let result = binder().bind("greet", &params, &json!({}), &ExecutionContext::new());
        match &result[0] {
            BoundArgument::Success { value, .. } => assert!(value.as_context().is_some()),
            BoundArgument::Failure { .. } => panic!("expected a success"),
        }
    }

    #[test]
    fn wrong_json_kind_fails() {
        let params = vec![ParameterSpec::new("count", "number")];
        let result = binder().bind("greet", &params, &json!({"count": "not-a-number"}), &ExecutionContext::new());
        assert!(!result[0].is_success());
    }

    #[test]
    fn unknown_type_handler_fails() {
        let params = vec![ParameterSpec::new("thing", "widget")];
        let result = binder().bind("greet", &params, &json!({"thing": 1}), &ExecutionContext::new());
        assert!(!result[0].is_success());
    }
}
