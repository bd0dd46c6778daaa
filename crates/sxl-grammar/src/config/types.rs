//! Grammar type definitions: the raw on-disk (YAML) shape and the runtime model
//! built from it.
//!
//! Two-phase pattern: `Raw*` structs are the serde deserialization target and mirror
//! the YAML keys verbatim (§6 of the spec this crate implements); `TryFrom<RawGrammarFile>`
//! converts into the runtime `SxlGrammar` the validator actually walks, compiling regexes
//! once and rejecting the one thing the raw format must never contain — `EMBED` as a
//! defined symbol.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The name every DSL grammar implicitly reserves for cross-DSL embedding.
pub const EMBED_SYMBOL: &str = "EMBED";

// =============================================================================
// RAW (ON-DISK) SHAPE
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawGrammarFile {
    pub meta_grammar_version: String,
    pub dsl: RawDslMeta,
    #[serde(default)]
    pub symbols: IndexMap<String, RawSymbolDef>,
    pub literals: RawLiterals,
    pub identifier: RawIdentifier,
    #[serde(default)]
    pub reserved_symbols: Vec<String>,
    #[serde(default)]
    pub embedding: RawEmbedding,
    #[serde(default)]
    pub constraints: Vec<RawConstraint>,
    #[serde(default)]
    pub llm_specs: RawLlmSpecs,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDslMeta {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSymbolDef {
    #[serde(default)]
    pub description: String,
    pub kind: String,
    #[serde(default)]
    pub params: Vec<RawParam>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawParam {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub allowed_symbols: Option<Vec<String>>,
    pub cardinality: String,
    #[serde(default = "default_true")]
    pub ordered: bool,
    #[serde(default)]
    pub identifier_rules: Option<RawIdentifierRules>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawIdentifierRules {
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawLiterals {
    pub string: RawRegexRule,
    pub number: RawRegexRule,
    pub boolean: RawValuesRule,
    pub null: RawValuesRule,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRegexRule {
    #[serde(default = "default_permissive_regex")]
    pub regex: String,
}

fn default_permissive_regex() -> String {
    ".*".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawValuesRule {
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawIdentifier {
    #[serde(default)]
    pub description: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawEmbedding {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_embed_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub auto_register_symbol: bool,
    #[serde(default)]
    pub params: Vec<RawParam>,
}

fn default_embed_symbol() -> String {
    EMBED_SYMBOL.to_string()
}

impl Default for RawEmbedding {
    fn default() -> Self {
        Self {
            enabled: true,
            symbol: default_embed_symbol(),
            auto_register_symbol: false,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConstraint {
    pub rule: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub depends_on: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLlmSpecs {
    #[serde(default)]
    pub defaults: String,
    #[serde(default)]
    pub provider_defaults: HashMap<String, String>,
    #[serde(default)]
    pub models: HashMap<String, String>,
    #[serde(default)]
    pub profiles: HashMap<String, String>,
}

// =============================================================================
// RUNTIME MODEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Node,
    Operator,
    Special,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Required,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    Null,
}

/// A parameter's expected shape, per §3/§4.5.
#[derive(Debug, Clone)]
pub enum ParamType {
    /// Matches anything.
    Any,
    /// A symbol call (or a bare identifier listed in `allowed_symbols`).
    Node,
    /// A bare identifier not equal to any defined symbol (unless allow-listed).
    Identifier,
    /// `literal(k1|k2|...)`.
    Literal(Vec<LiteralKind>),
    /// A bare identifier naming a DSL known to the grammar registry.
    DslId,
    /// The universal `EMBED` construct.
    Embedded,
}

#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub allowed_symbols: Option<Vec<String>>,
    pub cardinality: Cardinality,
    /// Only `true` (the default) is fully implemented; see crate docs / DESIGN.md.
    pub ordered: bool,
    pub identifier_pattern: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct SymbolDefinition {
    pub description: String,
    pub kind: SymbolKind,
    pub params: Vec<ParameterDefinition>,
    pub constraints: Vec<String>,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LiteralRules {
    pub string: Regex,
    pub number: Regex,
    pub boolean_values: Vec<String>,
    pub null_values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IdentifierRule {
    pub description: String,
    pub pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    pub symbol: String,
    pub auto_register_symbol: bool,
    pub params: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone)]
pub struct GlobalConstraint {
    pub rule: String,
    pub target: Option<String>,
    pub symbol: Option<String>,
    pub depends_on: Option<String>,
}

/// Per-provider/per-model LLM guidance overrides, resolved defaults-first (§4.6).
#[derive(Debug, Clone, Default)]
pub struct LlmGuidance {
    pub defaults: String,
    pub provider_defaults: HashMap<String, String>,
    pub models: HashMap<String, String>,
    pub profiles: HashMap<String, String>,
}

impl LlmGuidance {
    /// Resolves guidance text: model override, else provider default, else defaults.
    pub fn resolve(&self, provider: Option<&str>, model: Option<&str>) -> &str {
        if let Some(m) = model {
            if let Some(text) = self.models.get(m) {
                return text;
            }
        }
        if let Some(p) = provider {
            if let Some(text) = self.provider_defaults.get(p) {
                return text;
            }
        }
        &self.defaults
    }
}

#[derive(Debug, Clone)]
pub struct SxlGrammar {
    pub dsl_id: String,
    pub version: String,
    pub description: String,
    pub symbols: IndexMap<String, SymbolDefinition>,
    pub literals: LiteralRules,
    pub identifier: IdentifierRule,
    pub reserved_symbols: HashSet<String>,
    pub embedding: EmbeddingConfig,
    pub global_constraints: Vec<GlobalConstraint>,
    pub llm_guidance: LlmGuidance,
}

impl SxlGrammar {
    /// Sorted symbol names, for "unknown symbol" diagnostics (§4.5).
    pub fn known_symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self.symbols.keys().cloned().collect();
        names.sort();
        names
    }
}

// =============================================================================
// LOAD-TIME ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum GrammarLoadError {
    #[error("'{0}' is reserved and must not be defined as a symbol")]
    ReservedSymbolDefined(String),
    #[error("symbol '{symbol}' has unknown kind '{kind}' (expected node|operator|special|literal)")]
    UnknownSymbolKind { symbol: String, kind: String },
    #[error("symbol '{symbol}' parameter '{param}' has unknown cardinality '{value}'")]
    UnknownCardinality {
        symbol: String,
        param: String,
        value: String,
    },
    #[error("symbol '{symbol}' parameter '{param}' has unparseable type '{value}'")]
    UnknownParamType {
        symbol: String,
        param: String,
        value: String,
    },
    #[error("invalid regex in grammar '{context}': {source}")]
    InvalidRegex {
        context: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to parse grammar YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to read grammar file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TryFrom<RawGrammarFile> for SxlGrammar {
    type Error = GrammarLoadError;

    fn try_from(raw: RawGrammarFile) -> Result<Self, Self::Error> {
        if raw.symbols.contains_key(EMBED_SYMBOL) {
            return Err(GrammarLoadError::ReservedSymbolDefined(EMBED_SYMBOL.to_string()));
        }

        let mut symbols = IndexMap::with_capacity(raw.symbols.len());
        for (name, raw_def) in raw.symbols {
            let def = convert_symbol(&name, raw_def)?;
            symbols.insert(name, def);
        }

        let literals = LiteralRules {
            string: compile_regex("literals.string", &raw.literals.string.regex)?,
            number: compile_regex("literals.number", &raw.literals.number.regex)?,
            boolean_values: raw.literals.boolean.values,
            null_values: raw.literals.null.values,
        };

        let identifier = IdentifierRule {
            description: raw.identifier.description,
            pattern: compile_regex("identifier", &raw.identifier.pattern)?,
        };

        let mut reserved_symbols: HashSet<String> = raw.reserved_symbols.into_iter().collect();
        reserved_symbols.insert(EMBED_SYMBOL.to_string());

        let embedding_params = raw
            .embedding
            .params
            .into_iter()
            .map(|p| convert_param("EMBED", p))
            .collect::<Result<Vec<_>, _>>()?;
        let embedding = EmbeddingConfig {
            enabled: raw.embedding.enabled,
            symbol: raw.embedding.symbol,
            auto_register_symbol: raw.embedding.auto_register_symbol,
            params: embedding_params,
        };

        let global_constraints = raw
            .constraints
            .into_iter()
            .map(|c| GlobalConstraint {
                rule: c.rule,
                target: c.target,
                symbol: c.symbol,
                depends_on: c.depends_on,
            })
            .collect();

        let llm_guidance = LlmGuidance {
            defaults: raw.llm_specs.defaults,
            provider_defaults: raw.llm_specs.provider_defaults,
            models: raw.llm_specs.models,
            profiles: raw.llm_specs.profiles,
        };

        Ok(SxlGrammar {
            dsl_id: raw.dsl.id,
            version: raw.dsl.version,
            description: raw.dsl.description,
            symbols,
            literals,
            identifier,
            reserved_symbols,
            embedding,
            global_constraints,
            llm_guidance,
        })
    }
}

fn convert_symbol(name: &str, raw: RawSymbolDef) -> Result<SymbolDefinition, GrammarLoadError> {
    let kind = match raw.kind.as_str() {
        "node" => SymbolKind::Node,
        "operator" => SymbolKind::Operator,
        "special" => SymbolKind::Special,
        "literal" => SymbolKind::Literal,
        other => {
            return Err(GrammarLoadError::UnknownSymbolKind {
                symbol: name.to_string(),
                kind: other.to_string(),
            })
        }
    };
    let params = raw
        .params
        .into_iter()
        .map(|p| convert_param(name, p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SymbolDefinition {
        description: raw.description,
        kind,
        params,
        constraints: raw.constraints,
        examples: raw.examples,
    })
}

fn convert_param(symbol: &str, raw: RawParam) -> Result<ParameterDefinition, GrammarLoadError> {
    let cardinality = match raw.cardinality.as_str() {
        "required" => Cardinality::Required,
        "optional" => Cardinality::Optional,
        "zeroOrMore" | "zero_or_more" => Cardinality::ZeroOrMore,
        "oneOrMore" | "one_or_more" => Cardinality::OneOrMore,
        other => {
            return Err(GrammarLoadError::UnknownCardinality {
                symbol: symbol.to_string(),
                param: raw.name.clone(),
                value: other.to_string(),
            })
        }
    };
    let param_type = parse_param_type(symbol, &raw.name, &raw.param_type)?;
    let identifier_pattern = match raw.identifier_rules {
        Some(rules) => Some(compile_regex(&format!("{symbol}.{}", raw.name), &rules.pattern)?),
        None => None,
    };
    Ok(ParameterDefinition {
        name: raw.name,
        description: raw.description,
        param_type,
        allowed_symbols: raw.allowed_symbols,
        cardinality,
        ordered: raw.ordered,
        identifier_pattern,
    })
}

fn parse_param_type(symbol: &str, param: &str, value: &str) -> Result<ParamType, GrammarLoadError> {
    let err = || GrammarLoadError::UnknownParamType {
        symbol: symbol.to_string(),
        param: param.to_string(),
        value: value.to_string(),
    };
    match value {
        "any" => Ok(ParamType::Any),
        "node" => Ok(ParamType::Node),
        "identifier" => Ok(ParamType::Identifier),
        "dsl-id" => Ok(ParamType::DslId),
        "embedded" => Ok(ParamType::Embedded),
        _ if value.starts_with("literal(") && value.ends_with(')') => {
            let inner = &value[8..value.len() - 1];
            let kinds = inner
                .split('|')
                .map(|k| match k.trim() {
                    "string" => Ok(LiteralKind::String),
                    "number" => Ok(LiteralKind::Number),
                    "boolean" => Ok(LiteralKind::Boolean),
                    "null" => Ok(LiteralKind::Null),
                    _ => Err(err()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if kinds.is_empty() {
                return Err(err());
            }
            Ok(ParamType::Literal(kinds))
        }
        _ => Err(err()),
    }
}

fn compile_regex(context: &str, pattern: &str) -> Result<Regex, GrammarLoadError> {
    Regex::new(pattern).map_err(|source| GrammarLoadError::InvalidRegex {
        context: context.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw(symbols: IndexMap<String, RawSymbolDef>) -> RawGrammarFile {
        RawGrammarFile {
            meta_grammar_version: "1".into(),
            dsl: RawDslMeta {
                id: "sxl-test".into(),
                description: "test dsl".into(),
                version: "1.0".into(),
            },
            symbols,
            literals: RawLiterals {
                string: RawRegexRule { regex: ".*".into() },
                number: RawRegexRule { regex: "^-?[0-9]+(\\.[0-9]+)?$".into() },
                boolean: RawValuesRule {
                    values: vec!["true".into(), "false".into()],
                },
                null: RawValuesRule {
                    values: vec!["null".into(), "nil".into()],
                },
            },
            identifier: RawIdentifier {
                description: "identifiers".into(),
                pattern: "^[a-zA-Z_][a-zA-Z0-9_.]*$".into(),
            },
            reserved_symbols: vec![],
            embedding: RawEmbedding::default(),
            constraints: vec![],
            llm_specs: RawLlmSpecs::default(),
        }
    }

    #[test]
    fn embed_defined_as_symbol_is_rejected() {
        let mut symbols = IndexMap::new();
        symbols.insert(
            "EMBED".to_string(),
            RawSymbolDef {
                description: "nope".into(),
                kind: "node".into(),
                params: vec![],
                constraints: vec![],
                examples: vec![],
            },
        );
        let raw = minimal_raw(symbols);
        let err = SxlGrammar::try_from(raw).unwrap_err();
        assert!(matches!(err, GrammarLoadError::ReservedSymbolDefined(_)));
    }

    #[test]
    fn grammar_without_embed_loads_successfully() {
        let mut symbols = IndexMap::new();
        symbols.insert(
            "greet".to_string(),
            RawSymbolDef {
                description: "greets someone".into(),
                kind: "node".into(),
                params: vec![RawParam {
                    name: "who".into(),
                    description: "".into(),
                    param_type: "literal(string)".into(),
                    allowed_symbols: None,
                    cardinality: "required".into(),
                    ordered: true,
                    identifier_rules: None,
                }],
                constraints: vec![],
                examples: vec![],
            },
        );
        let raw = minimal_raw(symbols);
        let grammar = SxlGrammar::try_from(raw).unwrap();
        assert_eq!(grammar.dsl_id, "sxl-test");
        assert!(grammar.reserved_symbols.contains(EMBED_SYMBOL));
        assert_eq!(grammar.known_symbols(), vec!["greet".to_string()]);
    }

    #[test]
    fn literal_param_type_parses_multiple_kinds() {
        let ty = parse_param_type("s", "p", "literal(string|number)").unwrap();
        assert!(matches!(ty, ParamType::Literal(kinds) if kinds.len() == 2));
    }

    #[test]
    fn unknown_param_type_is_rejected() {
        let err = parse_param_type("s", "p", "bogus").unwrap_err();
        assert!(matches!(err, GrammarLoadError::UnknownParamType { .. }));
    }
}
