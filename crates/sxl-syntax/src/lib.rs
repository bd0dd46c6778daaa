//! sxl-syntax: lexer, parser, AST, and unified diagnostics for the SXL S-expression DSL.
//!
//! This crate is grammar-agnostic: it recognizes `(symbol arg...)` shape and literal
//! forms, but has no notion of which symbols are legal or how many arguments they take.
//! That belongs to `sxl-grammar`, which validates a `Program` produced here against a
//! loaded `SxlGrammar`.

pub mod ast;
pub mod diagnostics;
pub mod parser;

pub use ast::{find_bare_identifiers, AstVisitor, Literal, Program, Span, SxlNode};
pub use diagnostics::{Diagnostic, DiagnosticCode, RelatedInfo, Severity, SourceSpan};
pub use parser::{parse_expression_str, parse_program, SxlParseError};
