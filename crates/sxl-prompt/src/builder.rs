//! Assembles the model-facing prompt text from the action catalog and the DSL
//! grammars those actions reference (§4.6).
//!
//! No template engine: like the teacher's ad hoc context renderer, this is a small
//! string (or `serde_json::Value`) builder with one function per rendering mode.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use sxl_grammar::config::types::{Cardinality, ParamType, ParameterDefinition, SxlGrammar, SymbolDefinition};
use sxl_grammar::GrammarRegistry;
use sxl_planner::{ActionDescriptor, ActionRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Sxl,
    Json,
}

/// Lets a caller append DSL-specific context beyond the grammar's own guidance —
/// e.g. the live action catalog for `sxl-plan`, or a SQL schema catalog for `sxl-sql`.
pub trait PromptContributor: Send + Sync {
    fn dsl_id(&self) -> &str;
    fn contribute(&self, mode: PromptMode) -> Option<String>;
}

fn dsl_order_key(id: &str) -> (u8, &str) {
    match id {
        "sxl-universal" => (0, ""),
        "sxl-plan" => (1, ""),
        other => (2, other),
    }
}

fn collect_dsl_ids(actions: &[&ActionDescriptor], grammars: &GrammarRegistry, contributors: &[&dyn PromptContributor]) -> Vec<String> {
    let mut ids: HashSet<String> = HashSet::new();
    for action in actions {
        for param in &action.parameters {
            if let Some(dsl_id) = &param.dsl_id {
                ids.insert(dsl_id.clone());
            }
        }
    }
    if grammars.lookup("sxl-universal").is_some() {
        ids.insert("sxl-universal".to_string());
    }
    if grammars.lookup("sxl-plan").is_some() {
        ids.insert("sxl-plan".to_string());
    }
    for contributor in contributors {
        ids.insert(contributor.dsl_id().to_string());
    }

    let mut ordered: Vec<String> = ids.into_iter().collect();
    ordered.sort_by(|a, b| dsl_order_key(a).cmp(&dsl_order_key(b)));
    ordered
}

fn format_literal_kind(kind: &sxl_grammar::config::types::LiteralKind) -> &'static str {
    use sxl_grammar::config::types::LiteralKind;
    match kind {
        LiteralKind::String => "string",
        LiteralKind::Number => "number",
        LiteralKind::Boolean => "boolean",
        LiteralKind::Null => "null",
    }
}

fn format_param_type(param_type: &ParamType) -> String {
    match param_type {
        ParamType::Any => "any".to_string(),
        ParamType::Node => "node".to_string(),
        ParamType::Identifier => "identifier".to_string(),
        ParamType::Literal(kinds) => format!("literal({})", kinds.iter().map(format_literal_kind).collect::<Vec<_>>().join("|")),
        ParamType::DslId => "dslId".to_string(),
        ParamType::Embedded => "EMBED".to_string(),
    }
}

fn format_cardinality(cardinality: Cardinality) -> &'static str {
    match cardinality {
        Cardinality::Required => "required",
        Cardinality::Optional => "optional",
        Cardinality::ZeroOrMore => "zeroOrMore",
        Cardinality::OneOrMore => "oneOrMore",
    }
}

fn format_param(param: &ParameterDefinition) -> String {
    let mut out = format!("{}:{}({})", param.name, format_param_type(&param.param_type), format_cardinality(param.cardinality));
    if let Some(allowed) = &param.allowed_symbols {
        out.push_str(&format!("{{allowed={}}}", allowed.join(",")));
    }
    out
}

fn format_symbol(name: &str, def: &SymbolDefinition) -> String {
    let params = def.params.iter().map(format_param).collect::<Vec<_>>().join(", ");
    format!("- {name} ({:?}): {} [{}]", def.kind, def.description, params)
}

/// A concise, human-readable grammar summary (§4.6 SXL-mode body).
fn grammar_summary(grammar: &SxlGrammar) -> String {
    let mut lines = vec![format!("{} (v{}): {}", grammar.dsl_id, grammar.version, grammar.description)];
    for name in grammar.known_symbols() {
        let def = grammar.symbols.get(&name).expect("known_symbols only returns keys present in symbols");
        lines.push(format_symbol(&name, def));
    }
    if !grammar.reserved_symbols.is_empty() {
        let mut reserved: Vec<String> = grammar.reserved_symbols.iter().cloned().collect();
        reserved.sort();
        lines.push(format!("reserved: {}", reserved.join(", ")));
    }
    lines.join("\n")
}

/// A JSON-ish schema object for one grammar (§4.6 JSON-mode `dslSchemas` entry).
fn grammar_schema(grammar: &SxlGrammar) -> Value {
    let symbols: Vec<Value> = grammar
        .known_symbols()
        .iter()
        .map(|name| {
            let def = grammar.symbols.get(name).expect("known_symbols only returns keys present in symbols");
            json!({
                "name": name,
                "kind": format!("{:?}", def.kind),
                "params": def.params.iter().map(|p| json!({
                    "name": p.name,
                    "type": format_param_type(&p.param_type),
                    "cardinality": format_cardinality(p.cardinality),
                    "allowedSymbols": p.allowed_symbols,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut reserved: Vec<String> = grammar.reserved_symbols.iter().cloned().collect();
    reserved.sort();

    json!({
        "dslId": grammar.dsl_id,
        "version": grammar.version,
        "symbols": symbols,
        "reserved": reserved,
    })
}

/// Assembles the full prompt text.
///
/// `filter` selects which registered actions are advertised; `example_plan`, when
/// given, is rendered directly after the `sxl-plan` DSL block in SXL mode.
#[allow(clippy::too_many_arguments)]
pub fn build(
    registry: &ActionRegistry,
    filter: impl Fn(&ActionDescriptor) -> bool,
    grammars: &GrammarRegistry,
    mode: PromptMode,
    contributors: &[&dyn PromptContributor],
    example_plan: Option<&str>,
    provider: Option<&str>,
    model: Option<&str>,
) -> String {
    let actions: Vec<&ActionDescriptor> = registry.iter().filter(|d| filter(d)).collect();
    let dsl_ids = collect_dsl_ids(&actions, grammars, contributors);

    match mode {
        PromptMode::Sxl => build_sxl(&actions, grammars, &dsl_ids, contributors, example_plan, provider, model),
        PromptMode::Json => build_json(&actions, grammars, &dsl_ids, contributors, provider, model),
    }
}

fn build_sxl(
    actions: &[&ActionDescriptor],
    grammars: &GrammarRegistry,
    dsl_ids: &[String],
    contributors: &[&dyn PromptContributor],
    example_plan: Option<&str>,
    provider: Option<&str>,
    model: Option<&str>,
) -> String {
    let mut out = String::from("ACTIONS:\n");
    for action in actions {
        out.push_str(&format!("- {} ({:?}): {}\n", action.id, action.mutability, action.description));
    }

    out.push_str("\nDSL GUIDANCE:\n");
    let mut blocks = Vec::new();
    for dsl_id in dsl_ids {
        let Some(grammar) = grammars.lookup(dsl_id) else {
            tracing::warn!(dsl_id = %dsl_id, "prompt builder skipping dsl with no registered grammar");
            continue;
        };

        let mut body = grammar.llm_guidance.resolve(provider, model).to_string();
        body.push('\n');
        body.push_str(&grammar_summary(grammar));
        for contributor in contributors {
            if contributor.dsl_id() == dsl_id.as_str() {
                if let Some(extra) = contributor.contribute(PromptMode::Sxl) {
                    body.push('\n');
                    body.push_str(&extra);
                }
            }
        }
        blocks.push(format!("DSL {dsl_id}:\n{body}"));

        if dsl_id == "sxl-plan" {
            if let Some(example) = example_plan {
                blocks.push(format!("EXAMPLE PLAN:\n{example}"));
            }
        }
    }
    out.push_str(&blocks.join("\n\n"));
    out
}

fn build_json(
    actions: &[&ActionDescriptor],
    grammars: &GrammarRegistry,
    dsl_ids: &[String],
    contributors: &[&dyn PromptContributor],
    provider: Option<&str>,
    model: Option<&str>,
) -> String {
    let actions_json: Vec<Value> = actions
        .iter()
        .map(|action| {
            json!({
                "id": action.id,
                "description": action.description,
                "mutability": format!("{:?}", action.mutability),
                "parameters": action.parameters.iter().map(|p| json!({
                    "name": p.name,
                    "typeId": p.type_id,
                    "dslId": p.dsl_id,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut dsl_guidance = Map::new();
    let mut dsl_schemas = Map::new();
    for dsl_id in dsl_ids {
        let Some(grammar) = grammars.lookup(dsl_id) else {
            tracing::warn!(dsl_id = %dsl_id, "prompt builder skipping dsl with no registered grammar");
            continue;
        };

        let mut guidance = grammar.llm_guidance.resolve(provider, model).to_string();
        for contributor in contributors {
            if contributor.dsl_id() == dsl_id.as_str() {
                if let Some(extra) = contributor.contribute(PromptMode::Json) {
                    guidance.push('\n');
                    guidance.push_str(&extra);
                }
            }
        }

        dsl_guidance.insert(dsl_id.clone(), Value::String(guidance));
        dsl_schemas.insert(dsl_id.clone(), grammar_schema(grammar));
    }

    let root = json!({
        "actions": actions_json,
        "dslGuidance": Value::Object(dsl_guidance),
        "dslSchemas": Value::Object(dsl_schemas),
    });
    serde_json::to_string_pretty(&root).expect("a json! value built from valid UTF-8 strings always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sxl_grammar::load_str;
    use sxl_planner::ParameterSpec;

    const PLAN_GRAMMAR: &str = r#"
meta_grammar_version: "1"
dsl: { id: sxl-plan, description: "plan dsl", version: "1.0" }
symbols:
  PLAN:
    description: "a plan"
    kind: node
    params:
      - { name: message, description: "summary", type: "literal(string)", cardinality: required }
literals:
  string: { regex: ".*" }
  number: { regex: "^[0-9]+$" }
  boolean: { values: ["true", "false"] }
  null: { values: ["null"] }
identifier: { description: "", pattern: "^[a-z]+$" }
reserved_symbols: ["EMBED"]
llm_specs:
  defaults: "Use PLAN to submit a sequence of steps."
"#;

    fn registry_with_one_action() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry
            .register(ActionDescriptor::new("searchFlights", "searches flights").with_parameter(ParameterSpec::new("query", "string").with_dsl("sxl-plan")))
            .unwrap();
        registry
    }

    #[test]
    fn sxl_mode_orders_universal_then_plan_then_alphabetical() {
        let registry = registry_with_one_action();
        let mut grammars = GrammarRegistry::new();
        grammars.register(load_str(PLAN_GRAMMAR).unwrap());

        let prompt = build(&registry, |_| true, &grammars, PromptMode::Sxl, &[], Some("(PLAN \"hi\")"), None, None);
        assert!(prompt.contains("DSL sxl-plan:"));
        assert!(prompt.contains("EXAMPLE PLAN:\n(PLAN \"hi\")"));
        assert!(prompt.contains("Use PLAN to submit a sequence of steps."));
    }

    #[test]
    fn json_mode_emits_actions_guidance_and_schemas() {
        let registry = registry_with_one_action();
        let mut grammars = GrammarRegistry::new();
        grammars.register(load_str(PLAN_GRAMMAR).unwrap());

        let prompt = build(&registry, |_| true, &grammars, PromptMode::Json, &[], None, None, None);
        let parsed: Value = serde_json::from_str(&prompt).unwrap();
        assert!(parsed["actions"].as_array().unwrap().iter().any(|a| a["id"] == "searchFlights"));
        assert!(parsed["dslSchemas"]["sxl-plan"]["symbols"].as_array().unwrap().iter().any(|s| s["name"] == "PLAN"));
    }

    struct FakeContributor;
    impl PromptContributor for FakeContributor {
        fn dsl_id(&self) -> &str {
            "sxl-plan"
        }

        fn contribute(&self, _mode: PromptMode) -> Option<String> {
            Some("available actions: searchFlights".to_string())
        }
    }

    #[test]
    fn contributor_context_is_appended() {
        let registry = registry_with_one_action();
        let mut grammars = GrammarRegistry::new();
        grammars.register(load_str(PLAN_GRAMMAR).unwrap());
        let contributor = FakeContributor;
        let contributors: Vec<&dyn PromptContributor> = vec![&contributor];

        let prompt = build(&registry, |_| true, &grammars, PromptMode::Sxl, &contributors, None, None, None);
        assert!(prompt.contains("available actions: searchFlights"));
    }
}
