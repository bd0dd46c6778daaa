//! Grammar-driven validator.
//!
//! Stateless: all mutable state lives in `ValidationState`, threaded down through
//! recursive calls rather than stored on the validator itself (§4.5). Validates an
//! `SxlNode` tree against a loaded `SxlGrammar`, delegating `EMBED` subtrees to
//! whichever grammar the registry resolves for the referenced `dslId`.
//!
//! Unlike the teacher's executable-subset validator (which rejects nested calls
//! outright), this validator's whole job is nested calls: `EMBED` is the one
//! symbol no DSL may define and the one symbol this validator treats specially.

use sxl_syntax::ast::{Literal, SxlNode};
use sxl_syntax::diagnostics::{
    reserved_as_symbol_error, unknown_symbol_error, Diagnostic, DiagnosticCode,
};

use crate::config::types::{Cardinality, LiteralKind, ParamType, ParameterDefinition, SxlGrammar, EMBED_SYMBOL};
use crate::registry::GrammarRegistry;

/// Threaded validation state: the dotted context chain for error messages
/// (e.g. `EMBED.sxl-sql.Q`) is the only state that needs to survive recursion.
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    pub context_chain: Vec<String>,
}

impl ValidationState {
    fn child(&self, segment: impl Into<String>) -> Self {
        let mut chain = self.context_chain.clone();
        chain.push(segment.into());
        Self { context_chain: chain }
    }
}

/// Validates a full top-level program against `grammar`, applying global constraints
/// and recursively validating every node.
pub fn validate_program(program: &[SxlNode], grammar: &SxlGrammar, registry: &GrammarRegistry) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    diagnostics.extend(check_global_constraints(program, grammar));
    let state = ValidationState::default();
    for node in program {
        diagnostics.extend(validate_node(node, grammar, registry, &state));
    }
    diagnostics
}

/// Only `must_have_root` is implemented, and only against the first top-level
/// expression — the spec notes this behavior is ambiguous for multiple top-level
/// expressions and documents checking only the first (§9 Open Questions).
fn check_global_constraints(program: &[SxlNode], grammar: &SxlGrammar) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for constraint in &grammar.global_constraints {
        if constraint.rule == "must_have_root" {
            let Some(expected) = &constraint.symbol else { continue };
            match program.first().and_then(SxlNode::symbol_name) {
                Some(actual) if actual == expected => {}
                _ => diagnostics.push(Diagnostic::error(
                    DiagnosticCode::GlobalConstraintViolation,
                    format!("must_have_root: expected root symbol '{expected}'"),
                )),
            }
        }
    }
    diagnostics
}

fn validate_node(
    node: &SxlNode,
    grammar: &SxlGrammar,
    registry: &GrammarRegistry,
    state: &ValidationState,
) -> Vec<Diagnostic> {
    let SxlNode::Symbol { name, args, .. } = node else {
        // A bare literal with no enclosing parameter context: nothing further to check.
        return Vec::new();
    };

    if name == EMBED_SYMBOL {
        return validate_embed(args, registry, state);
    }

    if args.is_empty() {
        // Zero-arg symbol with no parent parameter slot: a bare identifier reference.
        // Type-level validation (is it allowed here?) is deferred to the parent's
        // parameter check; at top level we only reject it if it collides with a
        // reserved name that isn't itself a defined symbol.
        if grammar.reserved_symbols.contains(name) && !grammar.symbols.contains_key(name) {
            return vec![reserved_as_symbol_error(name, state.context_chain.clone())];
        }
        return Vec::new();
    }

    match grammar.symbols.get(name) {
        None => {
            if grammar.reserved_symbols.contains(name) {
                vec![reserved_as_symbol_error(name, state.context_chain.clone())]
            } else {
                vec![unknown_symbol_error(name, &grammar.known_symbols(), state.context_chain.clone())]
            }
        }
        Some(def) => {
            let child_state = state.child(name.clone());
            validate_params(args, &def.params, grammar, registry, &child_state)
        }
    }
}

fn validate_embed(args: &[SxlNode], registry: &GrammarRegistry, state: &ValidationState) -> Vec<Diagnostic> {
    let embed_state = state.child(EMBED_SYMBOL);

    let Some(dsl_id_node) = args.first() else {
        return vec![Diagnostic::error(
            DiagnosticCode::SxlParseError,
            "EMBED requires a dsl id as its first argument",
        )
        .with_context_chain(embed_state.context_chain.clone())];
    };

    let SxlNode::Symbol { name: dsl_id, args: dsl_id_args, .. } = dsl_id_node else {
        return vec![Diagnostic::error(
            DiagnosticCode::TypeMismatch,
            "EMBED's dsl id must be a bare identifier, not a literal",
        )
        .with_context_chain(embed_state.context_chain.clone())];
    };

    if !dsl_id_args.is_empty() {
        return vec![Diagnostic::error(
            DiagnosticCode::TypeMismatch,
            format!("EMBED's dsl id '{dsl_id}' must be a bare identifier, not a call"),
        )
        .with_context_chain(embed_state.context_chain.clone())];
    }

    let payload = &args[1..];
    if payload.is_empty() {
        return vec![Diagnostic::error(
            DiagnosticCode::SxlParseError,
            format!("EMBED for dsl '{dsl_id}' has no payload"),
        )
        .with_context_chain(embed_state.context_chain.clone())];
    }

    let dsl_state = embed_state.child(dsl_id.clone());
    let target_grammar = match registry.lookup(dsl_id) {
        Some(g) => g,
        None => {
            return vec![sxl_syntax::diagnostics::unknown_dsl_error(dsl_id, embed_state.context_chain.clone())]
        }
    };

    let mut diagnostics = check_global_constraints(payload, target_grammar);
    for node in payload {
        diagnostics.extend(validate_node(node, target_grammar, registry, &dsl_state));
    }
    diagnostics
}

/// Ordered positional matching per §4.5: an argument that doesn't match the current
/// optional/zeroOrMore slot's *category* advances the cursor without consuming the
/// argument; a category match that still fails full type validation is a hard error,
/// not a silent skip.
fn validate_params(
    args: &[SxlNode],
    params: &[ParameterDefinition],
    grammar: &SxlGrammar,
    registry: &GrammarRegistry,
    state: &ValidationState,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut ai = 0usize;

    for def in params {
        match def.cardinality {
            Cardinality::Required => {
                if ai >= args.len() {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::CardinalityViolation,
                            format!("missing required argument '{}'", def.name),
                        )
                        .with_context_chain(state.context_chain.clone()),
                    );
                    continue;
                }
                diagnostics.extend(check_type(&args[ai], def, grammar, registry, state));
                ai += 1;
            }
            Cardinality::Optional => {
                if ai < args.len() && category_matches(&args[ai], def) {
                    diagnostics.extend(check_type(&args[ai], def, grammar, registry, state));
                    ai += 1;
                }
            }
            Cardinality::ZeroOrMore => {
                while ai < args.len() && category_matches(&args[ai], def) {
                    diagnostics.extend(check_type(&args[ai], def, grammar, registry, state));
                    ai += 1;
                }
            }
            Cardinality::OneOrMore => {
                let mut matched = 0usize;
                while ai < args.len() && category_matches(&args[ai], def) {
                    diagnostics.extend(check_type(&args[ai], def, grammar, registry, state));
                    ai += 1;
                    matched += 1;
                }
                if matched == 0 {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::CardinalityViolation,
                            format!("expected at least one '{}'", def.name),
                        )
                        .with_context_chain(state.context_chain.clone()),
                    );
                }
            }
        }
    }

    if ai < args.len() {
        diagnostics.push(
            Diagnostic::error(
                DiagnosticCode::CardinalityViolation,
                format!("{} unexpected trailing argument(s)", args.len() - ai),
            )
            .with_context_chain(state.context_chain.clone()),
        );
    }

    diagnostics
}

/// Coarse shape test used to decide whether an optional/zeroOrMore slot should
/// consume the current argument at all, *before* running full type validation.
fn category_matches(arg: &SxlNode, def: &ParameterDefinition) -> bool {
    match &def.param_type {
        ParamType::Any => true,
        ParamType::Node => match arg {
            SxlNode::Symbol { name, .. } if name == EMBED_SYMBOL => true,
            SxlNode::Symbol { name, args, .. } if !args.is_empty() => def
                .allowed_symbols
                .as_ref()
                .map(|allowed| allowed.iter().any(|a| a == name))
                .unwrap_or(true),
            // A bare identifier is still a category match for a `node` slot — §4.5
            // and §3's invariant require it be *rejected*, not silently skipped, so
            // `check_type` must see it and raise the precise error.
            SxlNode::Symbol { args, .. } if args.is_empty() => true,
            _ => false,
        },
        ParamType::Identifier => matches!(arg, SxlNode::Symbol { args, .. } if args.is_empty()),
        ParamType::DslId => matches!(arg, SxlNode::Symbol { args, .. } if args.is_empty()),
        ParamType::Embedded => matches!(arg, SxlNode::Symbol { name, .. } if name == EMBED_SYMBOL),
        ParamType::Literal(_) => matches!(arg, SxlNode::Literal { .. }),
    }
}

/// Full type validation for an argument already chosen to fill `def`'s slot.
fn check_type(
    arg: &SxlNode,
    def: &ParameterDefinition,
    grammar: &SxlGrammar,
    registry: &GrammarRegistry,
    state: &ValidationState,
) -> Vec<Diagnostic> {
    let fail = |msg: String| {
        vec![Diagnostic::error(DiagnosticCode::TypeMismatch, msg).with_context_chain(state.context_chain.clone())]
    };

    match &def.param_type {
        ParamType::Any => Vec::new(),
        ParamType::Embedded => match arg {
            SxlNode::Symbol { name, args, .. } if name == EMBED_SYMBOL => validate_embed(args, registry, state),
            _ => fail(format!("parameter '{}' expects EMBED", def.name)),
        },
        ParamType::Node => match arg {
            SxlNode::Symbol { name, args, .. } if name == EMBED_SYMBOL => validate_embed(args, registry, state),
            SxlNode::Symbol { name, args, .. } if args.is_empty() => {
                if def.allowed_symbols.as_ref().map(|a| a.iter().any(|s| s == name)).unwrap_or(false) {
                    Vec::new()
                } else {
                    fail(format!(
                        "identifier '{name}' is not allowed where a node is expected for parameter '{}'",
                        def.name
                    ))
                }
            }
            SxlNode::Symbol { name, args: child_args, .. } => {
                let allowed = match &def.allowed_symbols {
                    Some(list) => list.iter().any(|s| s == name),
                    None => grammar.symbols.contains_key(name),
                };
                if !allowed {
                    return fail(format!("symbol '{name}' is not allowed for parameter '{}'", def.name));
                }
                // Allowed at this slot; recurse into the child's own arguments so a
                // nested call is validated as thoroughly as a top-level one (§4.5).
                match grammar.symbols.get(name) {
                    Some(child_def) => {
                        let child_state = state.child(name.clone());
                        validate_params(child_args, &child_def.params, grammar, registry, &child_state)
                    }
                    None => Vec::new(),
                }
            }
            SxlNode::Literal { .. } => fail(format!("parameter '{}' expects a node, found a literal", def.name)),
        },
        ParamType::Identifier => match arg {
            SxlNode::Symbol { name, args, .. } if !args.is_empty() => {
                fail(format!("parameter '{}' expects a bare identifier, found a call '{name}'", def.name))
            }
            SxlNode::Symbol { name, .. } => {
                if grammar.symbols.contains_key(name)
                    && !def.allowed_symbols.as_ref().map(|a| a.iter().any(|s| s == name)).unwrap_or(false)
                {
                    return fail(format!("'{name}' names a defined symbol and cannot be used as an identifier here"));
                }
                let pattern = def.identifier_pattern.as_ref().unwrap_or(&grammar.identifier.pattern);
                if pattern.is_match(name) {
                    Vec::new()
                } else {
                    vec![Diagnostic::error(
                        DiagnosticCode::IdentifierPatternViolation,
                        format!("identifier '{name}' does not match the required pattern"),
                    )
                    .with_context_chain(state.context_chain.clone())]
                }
            }
            SxlNode::Literal { .. } => fail(format!("parameter '{}' expects an identifier, found a literal", def.name)),
        },
        ParamType::DslId => match arg {
            SxlNode::Symbol { args, .. } if !args.is_empty() => {
                fail(format!("parameter '{}' expects a dsl id, found a call", def.name))
            }
            SxlNode::Symbol { name, .. } => {
                if registry.lookup(name).is_some() {
                    Vec::new()
                } else {
                    vec![sxl_syntax::diagnostics::unknown_dsl_error(name, state.context_chain.clone())]
                }
            }
            SxlNode::Literal { .. } => fail(format!("parameter '{}' expects a dsl id, found a literal", def.name)),
        },
        ParamType::Literal(kinds) => match arg {
            SxlNode::Literal { value, .. } => {
                if literal_matches_any_kind(value, kinds, grammar) {
                    Vec::new()
                } else {
                    fail(format!("literal does not satisfy any of the allowed kinds for parameter '{}'", def.name))
                }
            }
            SxlNode::Symbol { .. } => fail(format!("parameter '{}' expects a literal, found a symbol", def.name)),
        },
    }
}

fn literal_matches_any_kind(value: &Literal, kinds: &[LiteralKind], grammar: &SxlGrammar) -> bool {
    kinds.iter().any(|kind| literal_matches_kind(value, *kind, grammar))
}

fn literal_matches_kind(value: &Literal, kind: LiteralKind, grammar: &SxlGrammar) -> bool {
    match kind {
        LiteralKind::String => matches!(value, Literal::String(s) if grammar.literals.string.is_match(s)),
        LiteralKind::Number => match value {
            Literal::Number(_) => true,
            Literal::String(s) => grammar.literals.number.is_match(s),
            _ => false,
        },
        LiteralKind::Boolean => match value {
            Literal::Boolean(_) => true,
            Literal::String(s) => grammar.literals.boolean_values.iter().any(|v| v == s),
            _ => false,
        },
        LiteralKind::Null => match value {
            Literal::Null => true,
            Literal::String(s) => grammar.literals.null_values.iter().any(|v| v == s),
            _ => false,
        },
    }
}
