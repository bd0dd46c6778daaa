//! SXL abstract syntax tree.
//!
//! `SxlNode` is the single sum type every DSL dialect shares: a `Symbol` call
//! `(name arg...)` or a terminal `Literal`. A symbol with zero args is a bare
//! identifier; a literal never carries args. Grammars attach meaning to symbol
//! names and argument shapes — the AST itself is grammar-agnostic.

use serde::{Deserialize, Serialize};

/// Byte-offset span into the original source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering neither source text nor a real position; used for synthesized nodes.
    pub fn synthetic() -> Self {
        Self { start: 0, end: 0 }
    }
}

/// A terminal literal value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Literal {
    /// Textual form used by the grammar's literal regexes to classify a literal's kind.
    pub fn textual_form(&self) -> String {
        match self {
            Literal::String(s) => s.clone(),
            Literal::Number(n) => n.to_string(),
            Literal::Boolean(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A single SXL node: either a symbol call or a terminal literal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SxlNode {
    Symbol {
        name: String,
        args: Vec<SxlNode>,
        span: Span,
    },
    Literal {
        value: Literal,
        span: Span,
    },
}

impl SxlNode {
    pub fn symbol(name: impl Into<String>, args: Vec<SxlNode>, span: Span) -> Self {
        Self::Symbol {
            name: name.into(),
            args,
            span,
        }
    }

    pub fn literal(value: Literal, span: Span) -> Self {
        Self::Literal { value, span }
    }

    pub fn span(&self) -> Span {
        match self {
            SxlNode::Symbol { span, .. } => *span,
            SxlNode::Literal { span, .. } => *span,
        }
    }

    /// `true` for a symbol call with zero args — a bare identifier reference.
    pub fn is_bare_identifier(&self) -> bool {
        matches!(self, SxlNode::Symbol { args, .. } if args.is_empty())
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            SxlNode::Symbol { name, .. } => Some(name.as_str()),
            SxlNode::Literal { .. } => None,
        }
    }

    pub fn args(&self) -> &[SxlNode] {
        match self {
            SxlNode::Symbol { args, .. } => args,
            SxlNode::Literal { .. } => &[],
        }
    }

    /// Re-serializes the node to SXL source text. Used by the round-trip property in tests.
    pub fn to_source(&self) -> String {
        match self {
            SxlNode::Literal { value, .. } => match value {
                Literal::String(s) => format!("\"{s}\""),
                Literal::Number(n) => n.to_string(),
                Literal::Boolean(b) => b.to_string(),
                Literal::Null => "null".to_string(),
            },
            SxlNode::Symbol { name, args, .. } if args.is_empty() => name.clone(),
            SxlNode::Symbol { name, args, .. } => {
                let rendered: Vec<String> = args.iter().map(SxlNode::to_source).collect();
                format!("({name} {})", rendered.join(" "))
            }
        }
    }
}

/// A full SXL program: a top-level sequence of expressions.
pub type Program = Vec<SxlNode>;

/// Visitor over an SXL tree. Default methods walk children; override to intercept a node kind.
pub trait AstVisitor {
    fn visit_symbol(&mut self, name: &str, args: &[SxlNode], span: Span) {
        let _ = (name, span);
        for arg in args {
            self.visit(arg);
        }
    }

    fn visit_literal(&mut self, value: &Literal, span: Span) {
        let _ = (value, span);
    }

    fn visit(&mut self, node: &SxlNode) {
        match node {
            SxlNode::Symbol { name, args, span } => self.visit_symbol(name, args, *span),
            SxlNode::Literal { value, span } => self.visit_literal(value, *span),
        }
    }

    fn visit_program(&mut self, program: &Program) {
        for node in program {
            self.visit(node);
        }
    }
}

/// Collects every bare-identifier reference found anywhere in a tree (used by the
/// planner's argument binder when resolving `fromContext`-style indirection inside SXL).
pub fn find_bare_identifiers(program: &Program) -> Vec<String> {
    struct Collector(Vec<String>);
    impl AstVisitor for Collector {
        fn visit_symbol(&mut self, name: &str, args: &[SxlNode], _span: Span) {
            if args.is_empty() {
                self.0.push(name.to_string());
            } else {
                for arg in args {
                    self.visit(arg);
                }
            }
        }
    }
    let mut collector = Collector(Vec::new());
    collector.visit_program(program);
    collector.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, args: Vec<SxlNode>) -> SxlNode {
        SxlNode::symbol(name, args, Span::synthetic())
    }

    fn lit_str(s: &str) -> SxlNode {
        SxlNode::literal(Literal::String(s.to_string()), Span::synthetic())
    }

    #[test]
    fn bare_identifier_has_no_args() {
        let node = sym("orders", vec![]);
        assert!(node.is_bare_identifier());
    }

    #[test]
    fn symbol_with_args_is_not_bare() {
        let node = sym("greet", vec![lit_str("world")]);
        assert!(!node.is_bare_identifier());
    }

    #[test]
    fn to_source_round_trips_nested_calls() {
        let node = sym("F", vec![sym("orders", vec![]), sym("o", vec![])]);
        assert_eq!(node.to_source(), "(F orders o)");
    }

    #[test]
    fn to_source_renders_string_literal_quoted() {
        let node = lit_str("hello");
        assert_eq!(node.to_source(), "\"hello\"");
    }

    #[test]
    fn find_bare_identifiers_collects_leaves_only() {
        let program: Program = vec![sym("Q", vec![sym("F", vec![sym("orders", vec![])]), sym("id", vec![])])];
        let idents = find_bare_identifiers(&program);
        assert_eq!(idents, vec!["orders".to_string(), "id".to_string()]);
    }

    #[test]
    fn literal_textual_form_for_each_kind() {
        assert_eq!(Literal::String("x".into()).textual_form(), "x");
        assert_eq!(Literal::Number(3.5).textual_form(), "3.5");
        assert_eq!(Literal::Boolean(true).textual_form(), "true");
        assert_eq!(Literal::Null.textual_form(), "null");
    }
}
