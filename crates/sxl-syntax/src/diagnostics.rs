//! Unified diagnostics
//!
//! Single diagnostic type used across parse, validation, planning, and execution.
//! Every later crate in this workspace (`sxl-grammar`, `sxl-planner`, `sxl-exec`) reports
//! through this type rather than inventing its own, so a host can render any stage's errors
//! the same way.

use serde::{Deserialize, Serialize};

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Hint,
    Info,
}

/// Diagnostic codes, grouped by the pipeline stage that raises them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // -------------------------------------------------------------------
    // SXL: lexer/parser
    // -------------------------------------------------------------------
    SxlParseError,
    EmptyExpression,
    UnmatchedParen,
    UnexpectedRParen,

    // -------------------------------------------------------------------
    // SXL: grammar-driven validation
    // -------------------------------------------------------------------
    UnknownSymbol,
    ReservedAsSymbol,
    UnknownDSL,
    CardinalityViolation,
    TypeMismatch,
    IdentifierPatternViolation,
    GlobalConstraintViolation,

    // -------------------------------------------------------------------
    // Planning / binding
    // -------------------------------------------------------------------
    UnknownAction,
    MissingArgument,
    MissingContext,
    DeserializationFailed,
    ContextTypeError,

    // -------------------------------------------------------------------
    // DAG build
    // -------------------------------------------------------------------
    DuplicateStepId,
    InvalidStepId,
    UnknownDependency,
    SelfDependency,
    ContextContradiction,
    CycleDetected,

    // -------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------
    ActionTimeout,
    Cancelled,
    ContractViolation,
    ActionInvocationFailed,
}

/// Source location span, in line/column terms (1-based), suitable for editor tooling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Build a span from byte offsets into `source`.
    pub fn from_byte_offset(source: &str, start: usize, end: usize) -> Self {
        let (start_line, start_col) = byte_to_line_col(source, start);
        let (end_line, end_col) = byte_to_line_col(source, end);
        Self::new(start_line, start_col, end_line, end_col)
    }
}

fn byte_to_line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Related information for multi-location diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub message: String,
    pub span: SourceSpan,
}

/// A diagnostic message with location, severity, and the dotted EMBED context chain
/// (e.g. `EMBED.sxl-sql.Q`) it occurred under, if any.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub context_chain: Vec<String>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span: None,
            context_chain: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span: None,
            context_chain: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Hint,
            code,
            message: message.into(),
            span: None,
            context_chain: Vec::new(),
            related: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn with_context_chain(mut self, chain: Vec<String>) -> Self {
        self.context_chain = chain;
        self
    }

    #[must_use]
    pub fn with_related(mut self, related: RelatedInfo) -> Self {
        self.related.push(related);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }

    /// Dotted rendering of the context chain, e.g. `EMBED.sxl-sql.Q`.
    pub fn chain_string(&self) -> String {
        self.context_chain.join(".")
    }
}

// =============================================================================
// Convenience builders
// =============================================================================

pub fn unknown_symbol_error(symbol: &str, known: &[String], chain: Vec<String>) -> Diagnostic {
    let mut sorted = known.to_vec();
    sorted.sort();
    Diagnostic::error(
        DiagnosticCode::UnknownSymbol,
        format!("unknown symbol '{symbol}', known symbols: [{}]", sorted.join(", ")),
    )
    .with_context_chain(chain)
}

pub fn reserved_as_symbol_error(symbol: &str, chain: Vec<String>) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::ReservedAsSymbol,
        format!("'{symbol}' is reserved and cannot be used as a symbol"),
    )
    .with_context_chain(chain)
}

pub fn unknown_dsl_error(dsl_id: &str, chain: Vec<String>) -> Diagnostic {
    Diagnostic::error(DiagnosticCode::UnknownDSL, format!("unknown DSL '{dsl_id}'"))
        .with_context_chain(chain)
}

pub fn cycle_error(involved: &[String]) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::CycleDetected,
        format!("circular dependency detected involving: {}", involved.join(", ")),
    )
}

pub fn missing_arg_error(arg_name: &str, action_id: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::MissingArgument,
        format!("missing required argument '{arg_name}' for action '{action_id}'"),
    )
}

pub fn unknown_action_error(action_id: &str) -> Diagnostic {
    Diagnostic::error(DiagnosticCode::UnknownAction, format!("unknown action '{action_id}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_creation() {
        let diag = Diagnostic::error(DiagnosticCode::SxlParseError, "unexpected token");
        assert!(diag.is_error());
        assert_eq!(diag.message, "unexpected token");
    }

    #[test]
    fn warning_not_error() {
        let diag = Diagnostic::warning(DiagnosticCode::CardinalityViolation, "check cardinality");
        assert!(!diag.is_error());
        assert!(diag.is_warning());
    }

    #[test]
    fn with_span_and_chain() {
        let span = SourceSpan::new(1, 5, 1, 15);
        let diag = Diagnostic::error(DiagnosticCode::UnknownSymbol, "bad symbol")
            .with_span(span)
            .with_context_chain(vec!["EMBED".into(), "sxl-sql".into(), "Q".into()]);
        assert!(diag.span.is_some());
        assert_eq!(diag.chain_string(), "EMBED.sxl-sql.Q");
    }

    #[test]
    fn byte_to_line_col_conversion() {
        let source = "line1\nline2\nline3";
        assert_eq!(byte_to_line_col(source, 0), (1, 1));
        assert_eq!(byte_to_line_col(source, 5), (1, 6));
        assert_eq!(byte_to_line_col(source, 6), (2, 1));
        assert_eq!(byte_to_line_col(source, 12), (3, 1));
    }

    #[test]
    fn unknown_symbol_lists_sorted_known_set() {
        let known = vec!["zeta".to_string(), "alpha".to_string()];
        let diag = unknown_symbol_error("WRONG", &known, vec!["EMBED".into(), "sxl-sql".into(), "Q".into()]);
        assert!(diag.message.contains("alpha, zeta"));
        assert_eq!(diag.chain_string(), "EMBED.sxl-sql.Q");
    }
}
