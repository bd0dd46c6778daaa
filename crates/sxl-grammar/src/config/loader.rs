//! Grammar loader.
//!
//! Loads a `SxlGrammar` from YAML-equivalent configuration on disk. Search-path
//! resolution follows the teacher's `ConfigLoader::from_env` idiom: an explicit
//! env var override first, then a handful of conventional relative locations.

use std::path::{Path, PathBuf};

use tracing::info;

use super::types::{GrammarLoadError, RawGrammarFile, SxlGrammar};

/// Env var naming a directory of `*.yaml`/`*.yml` grammar files.
pub const GRAMMAR_DIR_ENV: &str = "SXL_GRAMMAR_DIR";

pub struct GrammarLoader {
    grammar_dir: PathBuf,
}

impl GrammarLoader {
    pub fn new(grammar_dir: impl Into<PathBuf>) -> Self {
        Self {
            grammar_dir: grammar_dir.into(),
        }
    }

    /// Resolves a grammar directory the way the teacher's config loader resolves
    /// its `config/` tree: explicit env override, then a `grammars/` directory
    /// relative to the current working directory, then one under
    /// `CARGO_MANIFEST_DIR`.
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(GRAMMAR_DIR_ENV) {
            return Self::new(dir);
        }
        if Path::new("grammars").exists() {
            return Self::new("grammars");
        }
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let candidate = Path::new(&manifest_dir).join("grammars");
            if candidate.exists() {
                return Self::new(candidate);
            }
        }
        Self::new(env!("CARGO_MANIFEST_DIR").to_string() + "/grammars")
    }

    /// Loads every `*.yaml`/`*.yml` file directly under the grammar directory.
    pub fn load_all(&self) -> Result<Vec<SxlGrammar>, GrammarLoadError> {
        let mut grammars = Vec::new();
        let entries = std::fs::read_dir(&self.grammar_dir).map_err(|source| GrammarLoadError::Io {
            path: self.grammar_dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| GrammarLoadError::Io {
                path: self.grammar_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if is_yaml {
                grammars.push(load_file(&path)?);
            }
        }
        info!(count = grammars.len(), dir = %self.grammar_dir.display(), "loaded SXL grammars");
        Ok(grammars)
    }
}

/// Loads a single grammar file from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<SxlGrammar, GrammarLoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| GrammarLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_str(&text)
}

/// Parses a grammar from an in-memory YAML string.
pub fn load_str(text: &str) -> Result<SxlGrammar, GrammarLoadError> {
    let raw: RawGrammarFile = serde_yaml::from_str(text)?;
    SxlGrammar::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
meta_grammar_version: "1"
dsl:
  id: sxl-sample
  description: a tiny sample dialect
  version: "1.0"
symbols:
  greet:
    description: greets someone
    kind: node
    params:
      - name: who
        description: the name to greet
        type: "literal(string)"
        cardinality: required
literals:
  string: { regex: ".*" }
  number: { regex: "^-?[0-9]+(\\.[0-9]+)?$" }
  boolean: { values: ["true", "false"] }
  null: { values: ["null", "nil"] }
identifier:
  description: plain identifiers
  pattern: "^[a-zA-Z_][a-zA-Z0-9_.]*$"
reserved_symbols: []
embedding:
  enabled: true
  symbol: EMBED
  auto_register_symbol: false
  params: []
constraints: []
llm_specs:
  defaults: "Use (greet \"name\") to greet someone."
"#;

    #[test]
    fn loads_sample_grammar_from_string() {
        let grammar = load_str(SAMPLE).unwrap();
        assert_eq!(grammar.dsl_id, "sxl-sample");
        assert!(grammar.symbols.contains_key("greet"));
    }

    #[test]
    fn load_all_reads_every_yaml_file_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("ignore.txt"), "not yaml").unwrap();
        let loader = GrammarLoader::new(dir.path());
        let grammars = loader.load_all().unwrap();
        assert_eq!(grammars.len(), 1);
    }
}
