//! sxl-grammar: the grammar model, YAML loader, and EMBED-aware validator for
//! SXL dialects.
//!
//! A `SxlGrammar` describes one DSL dialect: its symbols, their parameter shapes,
//! literal/identifier rules, reserved names, and LLM guidance. `GrammarRegistry`
//! holds every loaded dialect by `dslId` so the validator can resolve `EMBED`
//! subtrees without recursive ownership (§9).

pub mod config;
pub mod registry;
pub mod validator;

pub use config::loader::{load_file, load_str, GrammarLoader};
pub use config::types::{
    Cardinality, EmbeddingConfig, GlobalConstraint, GrammarLoadError, IdentifierRule, LiteralKind, LiteralRules,
    LlmGuidance, ParamType, ParameterDefinition, RawGrammarFile, SxlGrammar, SymbolDefinition, SymbolKind,
    EMBED_SYMBOL,
};
pub use registry::GrammarRegistry;
pub use validator::{validate_program, ValidationState};
