//! SXL lexer/parser.
//!
//! Universal, grammar-agnostic: produces a `Program` (sequence of `SxlNode`) from
//! `(symbol arg arg ...)` source text. Grammar-specific meaning (which symbols exist,
//! how many args they take) is layered on afterward by `sxl-grammar`'s validator —
//! this parser only needs to recognize shape, not vocabulary.
//!
//! Byte offsets for `Span` come from `nom_locate::LocatedSpan`, which carries the
//! original input's start position through every combinator so nested calls get
//! spans relative to the whole document, not to their own substring.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{alphanumeric1, char, digit1, multispace0, none_of},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    error::{context, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use nom_locate::LocatedSpan;

use crate::ast::{Literal, Program, Span, SxlNode};

type Input<'a> = LocatedSpan<&'a str>;
type ParseResult<'a, O> = IResult<Input<'a>, O, VerboseError<Input<'a>>>;

/// A parse error with a human-readable rendering and, when available, a byte offset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SxlParseError {
    #[error("empty expression '()' at byte {offset}")]
    EmptyExpression { offset: usize },
    #[error("unmatched '(' starting at byte {offset}")]
    UnmatchedParen { offset: usize },
    #[error("unexpected ')' at byte {offset}")]
    UnexpectedRParen { offset: usize },
    #[error("syntax error: {detail}")]
    Syntax { detail: String },
}

/// Parses a complete SXL program (sequence of top-level expressions).
pub fn parse_program(input: &str) -> Result<Program, SxlParseError> {
    if let Some(offset) = find_bare_rparen(input) {
        return Err(SxlParseError::UnexpectedRParen { offset });
    }
    if let Some(offset) = find_empty_parens(input) {
        return Err(SxlParseError::EmptyExpression { offset });
    }
    if let Some(offset) = find_unmatched_lparen(input) {
        return Err(SxlParseError::UnmatchedParen { offset });
    }

    let span = Input::new(input);
    match all_consuming(program)(span) {
        Ok((_, prog)) => Ok(prog),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SxlParseError::Syntax {
            detail: render_verbose_error(input, e),
        }),
        Err(nom::Err::Incomplete(_)) => Err(SxlParseError::UnmatchedParen { offset: input.len() }),
    }
}

/// Parses a single top-level expression (convenience entry point for REPL-style callers).
pub fn parse_expression_str(input: &str) -> Result<SxlNode, SxlParseError> {
    let trimmed = input.trim();
    let span = Input::new(trimmed);
    match all_consuming(delimited(multispace0, expression, multispace0))(span) {
        Ok((_, node)) => Ok(node),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SxlParseError::Syntax {
            detail: render_verbose_error(trimmed, e),
        }),
        Err(nom::Err::Incomplete(_)) => Err(SxlParseError::UnmatchedParen { offset: trimmed.len() }),
    }
}

fn render_verbose_error(_source: &str, e: VerboseError<Input<'_>>) -> String {
    e.errors
        .into_iter()
        .map(|(span, kind)| format!("at byte {}: {:?}", span.location_offset(), kind))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Scans for a `)` with no matching `(` before it — nom's combinators alone report this
/// as a generic parse failure; this gives the precise diagnostic code §4.4 requires
/// (`UnexpectedRParen`) without threading balance state through every combinator.
fn find_bare_rparen(input: &str) -> Option<usize> {
    let mut depth: i64 = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Scans for `(` directly followed by (only whitespace/commas, then) `)`.
fn find_empty_parens(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'(' {
            continue;
        }
        let mut j = i + 1;
        while j < bytes.len() && ((bytes[j] as char).is_whitespace() || bytes[j] == b',') {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b')' {
            return Some(i);
        }
    }
    None
}

/// Scans for a `(` with no matching `)` by the end of input.
fn find_unmatched_lparen(input: &str) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut first_unmatched: Option<usize> = None;
    for (i, c) in input.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    first_unmatched = Some(i);
                }
                depth += 1;
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    if depth > 0 {
        first_unmatched
    } else {
        None
    }
}

/// Whitespace and/or commas, any amount, in any order. Commas are an optional separator
/// between args per §4.4 — the grammar never requires one.
fn ws_or_comma(input: Input<'_>) -> ParseResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), nom::character::complete::multispace1),
            value((), char(',')),
        ))),
    )(input)
}

fn program(input: Input<'_>) -> ParseResult<'_, Program> {
    map(
        tuple((ws_or_comma, many0(tuple((expression, ws_or_comma))))),
        |(_, exprs)| exprs.into_iter().map(|(e, _)| e).collect(),
    )(input)
}

fn expression(input: Input<'_>) -> ParseResult<'_, SxlNode> {
    alt((symbol_call, bare_identifier, literal))(input)
}

fn span_between(start: Input<'_>, end: Input<'_>) -> Span {
    Span::new(start.location_offset(), end.location_offset())
}

fn symbol_call(input: Input<'_>) -> ParseResult<'_, SxlNode> {
    let start = input;
    let (after_open, _) = char('(')(input)?;
    let (after_ws, _) = multispace0(after_open)?;
    let (after_name, name) = cut(context("symbol name", identifier))(after_ws)?;
    let (after_args, args) = many0(preceded(ws_or_comma, expression))(after_name)?;
    let (after_ws2, _) = ws_or_comma(after_args)?;
    let (rest, _) = cut(context("closing ')'", char(')')))(after_ws2)?;

    let span = span_between(start, rest);
    Ok((rest, SxlNode::symbol(name.fragment().to_string(), args, span)))
}

fn bare_identifier(input: Input<'_>) -> ParseResult<'_, SxlNode> {
    let start = input;
    let (rest, name) = identifier(input)?;
    let span = span_between(start, rest);
    Ok((rest, SxlNode::symbol(name.fragment().to_string(), Vec::new(), span)))
}

fn identifier(input: Input<'_>) -> ParseResult<'_, Input<'_>> {
    recognize(pair(
        alt((alphanumeric1, tag("_"), tag("-"), tag("."), tag("@"))),
        many0(alt((alphanumeric1, tag("_"), tag("-"), tag(".")))),
    ))(input)
}

fn literal(input: Input<'_>) -> ParseResult<'_, SxlNode> {
    let start = input;
    let (rest, value) = alt((string_literal, number_literal, boolean_literal, null_literal))(input)?;
    let span = span_between(start, rest);
    Ok((rest, SxlNode::literal(value, span)))
}

fn string_literal(input: Input<'_>) -> ParseResult<'_, Literal> {
    map(alt((quoted('"'), quoted('\''))), Literal::String)(input)
}

fn quoted(delim: char) -> impl Fn(Input<'_>) -> ParseResult<'_, String> {
    move |input: Input<'_>| {
        delimited(
            char(delim),
            map(
                opt(escaped_transform(
                    none_of("\\\"'"),
                    '\\',
                    alt((
                        value('\\', char('\\')),
                        value('"', char('"')),
                        value('\'', char('\'')),
                        value('\n', char('n')),
                        value('\t', char('t')),
                    )),
                )),
                |s: Option<String>| s.unwrap_or_default(),
            ),
            char(delim),
        )(input)
    }
}

fn number_literal(input: Input<'_>) -> ParseResult<'_, Literal> {
    map(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        |span: Input<'_>| Literal::Number(span.fragment().parse().unwrap_or(f64::NAN)),
    )(input)
}

fn boolean_literal(input: Input<'_>) -> ParseResult<'_, Literal> {
    alt((
        value(Literal::Boolean(true), tag("true")),
        value(Literal::Boolean(false), tag("false")),
    ))(input)
}

fn null_literal(input: Input<'_>) -> ParseResult<'_, Literal> {
    value(Literal::Null, alt((tag("null"), tag("nil"))))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_symbol_call() {
        let prog = parse_program("(greet)").unwrap();
        assert_eq!(prog.len(), 1);
        assert_eq!(prog[0].symbol_name(), Some("greet"));
        assert!(prog[0].args().is_empty());
    }

    #[test]
    fn parses_nested_symbol_calls() {
        let prog = parse_program("(Q (F orders o) (S (AS o.id id)))").unwrap();
        assert_eq!(prog.len(), 1);
        assert_eq!(prog[0].symbol_name(), Some("Q"));
        assert_eq!(prog[0].args().len(), 2);
    }

    #[test]
    fn parses_string_number_boolean_null_literals() {
        let prog = parse_program("(f \"hi\" 42 true null)").unwrap();
        let args = prog[0].args();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn commas_between_args_are_swallowed() {
        let a = parse_program("(f 1, 2, 3)").unwrap();
        let b = parse_program("(f 1 2 3)").unwrap();
        assert_eq!(a[0].args().len(), b[0].args().len());
    }

    #[test]
    fn unexpected_rparen_is_reported() {
        let err = parse_program("(f 1))").unwrap_err();
        assert!(matches!(err, SxlParseError::UnexpectedRParen { .. }));
    }

    #[test]
    fn empty_expression_is_reported() {
        let err = parse_program("()").unwrap_err();
        assert!(matches!(err, SxlParseError::EmptyExpression { .. }));
    }

    #[test]
    fn unmatched_paren_is_reported() {
        let err = parse_program("(f 1").unwrap_err();
        assert!(matches!(err, SxlParseError::UnmatchedParen { .. }));
    }

    #[test]
    fn multiple_top_level_expressions() {
        let prog = parse_program("(a) (b) (c)").unwrap();
        assert_eq!(prog.len(), 3);
    }

    #[test]
    fn round_trip_through_to_source_reparses_identically() {
        let original = "(F orders o)";
        let prog = parse_program(original).unwrap();
        let rendered = prog[0].to_source();
        let reparsed = parse_program(&rendered).unwrap();
        assert_eq!(prog, reparsed);
    }

    #[test]
    fn nested_span_offsets_are_relative_to_whole_document() {
        let prog = parse_program("(Q (F orders o))").unwrap();
        let inner = &prog[0].args()[0];
        // "(F orders o)" starts at byte 3 within "(Q (F orders o))"
        assert_eq!(inner.span().start, 3);
    }
}
