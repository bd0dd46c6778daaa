//! Read-mostly registry of loaded `SxlGrammar`s, keyed by `dslId`.
//!
//! Registration happens at process initialization (§5); after that, lookups
//! never write. `EMBED` resolves its target DSL through this registry.

use indexmap::IndexMap;
use sxl_syntax::diagnostics::{unknown_dsl_error, Diagnostic};

use crate::config::types::SxlGrammar;

#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
    grammars: IndexMap<String, SxlGrammar>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a grammar, replacing any previous grammar with the same `dslId`.
    pub fn register(&mut self, grammar: SxlGrammar) {
        self.grammars.insert(grammar.dsl_id.clone(), grammar);
    }

    pub fn extend(&mut self, grammars: impl IntoIterator<Item = SxlGrammar>) {
        for grammar in grammars {
            self.register(grammar);
        }
    }

    pub fn lookup(&self, dsl_id: &str) -> Option<&SxlGrammar> {
        self.grammars.get(dsl_id)
    }

    /// `lookup`, but producing the `UnknownDSL` diagnostic on miss (§4.5).
    pub fn lookup_or_diagnostic(&self, dsl_id: &str, chain: Vec<String>) -> Result<&SxlGrammar, Diagnostic> {
        self.lookup(dsl_id).ok_or_else(|| unknown_dsl_error(dsl_id, chain))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.grammars.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_str;

    const SAMPLE: &str = r#"
meta_grammar_version: "1"
dsl: { id: sxl-sample, description: "", version: "1.0" }
symbols: {}
literals:
  string: { regex: ".*" }
  number: { regex: ".*" }
  boolean: { values: ["true", "false"] }
  null: { values: ["null"] }
identifier: { description: "", pattern: "^[a-z]+$" }
"#;

    #[test]
    fn unknown_dsl_lookup_produces_diagnostic() {
        let registry = GrammarRegistry::new();
        let err = registry.lookup_or_diagnostic("sxl-missing", vec!["EMBED".into()]).unwrap_err();
        assert_eq!(err.chain_string(), "EMBED");
    }

    #[test]
    fn registered_grammar_is_found_by_id() {
        let mut registry = GrammarRegistry::new();
        registry.register(load_str(SAMPLE).unwrap());
        assert!(registry.lookup("sxl-sample").is_some());
    }
}
