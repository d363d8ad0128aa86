use crate::Span;
use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::{Expr, Node};
use std::iter::Peekable;
use std::vec::IntoIter;
use thiserror::Error;

/// The syntax error family: anything wrong with the shape of the token
/// stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Syntax Error: Unexpected end of input")]
    UnexpectedEof,
    #[error("Syntax Error [at {0}]: Unmatched opening parenthesis")]
    UnmatchedOpenParen(Span),
    #[error("Syntax Error [at {0}]: Unexpected closing parenthesis")]
    UnexpectedCloseParen(Span),
    #[error("Syntax Error [at {1}]: Lists nested deeper than {0}")]
    NestingTooDeep(usize, Span),
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedEof => None,
            ParseError::UnmatchedOpenParen(span)
            | ParseError::UnexpectedCloseParen(span)
            | ParseError::NestingTooDeep(_, span) => Some(*span),
            ParseError::LexerError(lex_err) => Some(lex_err.span),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Deepest list nesting accepted in one expression.
pub const MAX_PARSE_DEPTH: usize = 512;

/// Peels expressions off the front of a token sequence one at a time.
pub struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    /// True while tokens remain for another top-level expression.
    pub fn has_more(&mut self) -> bool {
        self.tokens.peek().is_some()
    }

    /// Parses exactly one expression, consuming exactly its tokens.
    ///
    /// Lists are built on an explicit stack, so deeply nested input never
    /// turns into native recursion.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        // Lists still waiting for their `)`, innermost last
        let mut open: Vec<(Span, Vec<Node>)> = Vec::new();
        loop {
            let node = match self.tokens.next() {
                Some(Token {
                    kind: TokenKind::LParen,
                    span,
                }) => {
                    if open.len() == MAX_PARSE_DEPTH {
                        return Err(self.skip_too_deep(span));
                    }
                    open.push((span, Vec::new()));
                    continue;
                }
                Some(Token {
                    kind: TokenKind::RParen,
                    span,
                }) => match open.pop() {
                    Some((open_span, elements)) => {
                        Node::new(Expr::List(elements), open_span.merge(span))
                    }
                    None => return Err(ParseError::UnexpectedCloseParen(span)),
                },
                Some(Token {
                    kind: TokenKind::Atom(text),
                    span,
                }) => classify_atom(text, span),
                None => {
                    return Err(match open.pop() {
                        Some((open_span, _)) => ParseError::UnmatchedOpenParen(open_span),
                        None => ParseError::UnexpectedEof,
                    });
                }
            };
            match open.last_mut() {
                Some((_, elements)) => elements.push(node),
                None => return Ok(node),
            }
        }
    }

    /// Consumes the over-deep list opened at `span` without building it.
    /// Running out of input first makes it an unmatched paren instead.
    fn skip_too_deep(&mut self, span: Span) -> ParseError {
        let mut open = vec![span];
        for token in self.tokens.by_ref() {
            match token.kind {
                TokenKind::LParen => open.push(token.span),
                TokenKind::RParen => {
                    open.pop();
                    if open.is_empty() {
                        return ParseError::NestingTooDeep(MAX_PARSE_DEPTH, span);
                    }
                }
                TokenKind::Atom(_) => {}
            }
        }
        ParseError::UnmatchedOpenParen(open.last().copied().unwrap_or(span))
    }
}

impl Iterator for Parser {
    type Item = ParseResult<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_more() {
            Some(self.parse_expr())
        } else {
            None
        }
    }
}

/// Turns a raw atom token into a typed leaf node.
///
/// Order matters: quote-delimited text is a string even when it looks like a
/// number, and numbers win over the boolean spellings.
pub fn classify_atom(text: String, span: Span) -> Node {
    let kind = if text == "\"" {
        Expr::String(String::new())
    } else if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Expr::String(text[1..text.len() - 1].to_string())
    } else if let Some(n) = parse_number(&text) {
        Expr::Number(n)
    } else {
        match text.as_str() {
            "t" | "true" => Expr::Boolean(true),
            "nil" | "false" => Expr::Boolean(false),
            _ => Expr::Symbol(text),
        }
    };
    Node::new(kind, span)
}

/// Numeric literal rules of the embedding host: decimal with optional sign
/// and exponent, `0x`/`0o`/`0b` integers, and signed `Infinity`.
pub fn parse_number(text: &str) -> Option<f64> {
    let prefixed = |prefix_len: usize, radix: u32| {
        let digits = &text[prefix_len..];
        if digits.is_empty() {
            return None;
        }
        digits.chars().try_fold(0f64, |acc, c| {
            c.to_digit(radix)
                .map(|digit| acc * f64::from(radix) + f64::from(digit))
        })
    };
    match text.get(..2) {
        Some("0x" | "0X") => return prefixed(2, 16),
        Some("0o" | "0O") => return prefixed(2, 8),
        Some("0b" | "0B") => return prefixed(2, 2),
        _ => {}
    }

    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "Infinity" {
        return Some(if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    // Keeps Rust's `inf`/`nan` spellings out.
    if unsigned.is_empty()
        || !unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Lexes and parses exactly one expression.
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;

    match parser.tokens.next() {
        Some(Token {
            kind: TokenKind::RParen,
            span,
        }) => Err(ParseError::UnexpectedCloseParen(span)),
        // Trailing expressions are left for `parse_program`.
        _ => Ok(expr),
    }
}

/// Lexes and parses every top-level expression in `input`.
pub fn parse_program(input: &str) -> ParseResult<Vec<Node>> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_parse(input: &str, expected: Node) {
        match parse_str(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse_str(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn node_number(n: f64, start: usize, end: usize) -> Node {
        Node::new(Expr::Number(n), Span::new(start, end))
    }

    fn node_symbol(s: &str, start: usize, end: usize) -> Node {
        Node::new(Expr::Symbol(s.to_string()), Span::new(start, end))
    }

    fn node_string(s: &str, start: usize, end: usize) -> Node {
        Node::new(Expr::String(s.to_string()), Span::new(start, end))
    }

    fn node_bool(b: bool, start: usize, end: usize) -> Node {
        Node::new(Expr::Boolean(b), Span::new(start, end))
    }

    fn node_list(nodes: Vec<Node>, start: usize, end: usize) -> Node {
        Node::new(Expr::List(nodes), Span::new(start, end))
    }

    #[test]
    fn test_parse_atoms() {
        assert_parse("123", node_number(123.0, 0, 3));
        assert_parse("-4.5", node_number(-4.5, 0, 4));
        assert_parse("symbol", node_symbol("symbol", 0, 6));
        assert_parse("+", node_symbol("+", 0, 1));
        assert_parse(r#""hello world""#, node_string("hello world", 0, 13));
    }

    #[test]
    fn test_parse_boolean_spellings() {
        assert_parse("t", node_bool(true, 0, 1));
        assert_parse("true", node_bool(true, 0, 4));
        assert_parse("nil", node_bool(false, 0, 3));
        assert_parse("false", node_bool(false, 0, 5));
        assert_parse("T", node_symbol("T", 0, 1));
    }

    #[test]
    fn test_quoted_number_stays_string() {
        assert_parse(r#""42""#, node_string("42", 0, 4));
        assert_parse(r#""t""#, node_string("t", 0, 3));
    }

    #[test]
    fn test_parse_degenerate_strings() {
        assert_parse("\"\"", node_string("", 0, 2));
        assert_parse("\"", node_string("", 0, 1));
        // Starts with a quote but never closes: not a string.
        assert_parse("\"abc", node_symbol("\"abc", 0, 4));
    }

    #[test]
    fn test_parse_number_rules() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number("+10"), Some(10.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("5."), Some(5.0));
        assert_eq!(parse_number("-1e-3"), Some(-0.001));
        assert_eq!(parse_number("0x1F"), Some(31.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("0o17"), Some(15.0));
        assert_eq!(parse_number("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("0x"), None);
        assert_eq!(parse_number("-0x10"), None);
        assert_eq!(parse_number("1e"), None);
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("1-2"), None);
        assert_eq!(parse_number("1.2.3"), None);
    }

    #[test]
    fn test_parse_empty_list() {
        assert_parse("()", node_list(vec![], 0, 2));
        assert_parse("( )", node_list(vec![], 0, 3));
    }

    #[test]
    fn test_parse_simple_list() {
        assert_parse(
            "(+ 10 20)",
            node_list(
                vec![
                    node_symbol("+", 1, 2),
                    node_number(10.0, 3, 5),
                    node_number(20.0, 6, 8),
                ],
                0,
                9,
            ),
        );
        assert_parse(
            "(list t \"hello\")",
            node_list(
                vec![
                    node_symbol("list", 1, 5),
                    node_bool(true, 6, 7),
                    node_string("hello", 8, 15),
                ],
                0,
                16,
            ),
        );
    }

    #[test]
    fn test_parse_nested_list() {
        assert_parse(
            "(a (b c) d)",
            node_list(
                vec![
                    node_symbol("a", 1, 2),
                    node_list(vec![node_symbol("b", 4, 5), node_symbol("c", 6, 7)], 3, 8),
                    node_symbol("d", 9, 10),
                ],
                0,
                11,
            ),
        );
        assert_parse(
            "(()())",
            node_list(vec![node_list(vec![], 1, 3), node_list(vec![], 3, 5)], 0, 6),
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_parse_error("(1 2", ParseError::UnmatchedOpenParen(Span::default()));
        assert_parse_error("(", ParseError::UnmatchedOpenParen(Span::default()));
        assert_parse_error("((a)", ParseError::UnmatchedOpenParen(Span::default()));
        assert_parse_error(")", ParseError::UnexpectedCloseParen(Span::default()));
        assert_parse_error("(1))", ParseError::UnexpectedCloseParen(Span::default()));
        assert_parse_error("", ParseError::UnexpectedEof);
        assert_parse_error("; nothing here", ParseError::UnexpectedEof);
    }

    #[test]
    fn test_error_spans() {
        assert_eq!(
            parse_str("  (a b").unwrap_err(),
            ParseError::UnmatchedOpenParen(Span::new(2, 3))
        );
        assert_eq!(
            parse_str(") x").unwrap_err(),
            ParseError::UnexpectedCloseParen(Span::new(0, 1))
        );
    }

    #[test]
    fn test_long_run_of_open_parens_is_unmatched() {
        assert_eq!(
            parse_str(&"(".repeat(200_000)).unwrap_err(),
            ParseError::UnmatchedOpenParen(Span::new(199_999, 200_000))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "(list ".repeat(depth), ")".repeat(depth));
        assert!(parse_str(&nested(MAX_PARSE_DEPTH)).is_ok());

        let too_deep = Span::new(MAX_PARSE_DEPTH * 6, MAX_PARSE_DEPTH * 6 + 1);
        assert_eq!(
            parse_str(&nested(10_000)).unwrap_err(),
            ParseError::NestingTooDeep(MAX_PARSE_DEPTH, too_deep)
        );
        assert_eq!(
            parse_str(&nested(MAX_PARSE_DEPTH + 1)).unwrap_err(),
            ParseError::NestingTooDeep(MAX_PARSE_DEPTH, too_deep)
        );
    }

    #[test]
    fn test_parser_peels_one_expression_at_a_time() {
        let tokens = crate::lexer::tokenize("(a 1) b (c)").unwrap();
        let mut parser = Parser::new(tokens);

        assert!(matches!(parser.parse_expr().unwrap().kind, Expr::List(ref v) if v.len() == 2));
        assert_eq!(parser.parse_expr().unwrap(), node_symbol("b", 6, 7));
        assert!(parser.has_more());
        assert!(matches!(parser.parse_expr().unwrap().kind, Expr::List(_)));
        assert!(!parser.has_more());
        assert_eq!(parser.parse_expr(), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_parse_program() {
        let nodes = parse_program("(setq x 1) ; comment\n (+ x 2) x").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2], node_symbol("x", 30, 31));

        assert!(parse_program("").unwrap().is_empty());
        assert_eq!(
            parse_program("(a) (b").unwrap_err(),
            ParseError::UnmatchedOpenParen(Span::new(4, 5))
        );
    }

    #[test]
    fn test_display_round_trips_shape() {
        let node = parse_str(r#"(defun greet (name) (concat "hi " name))"#).unwrap();
        assert_eq!(
            node.to_string(),
            r#"(defun greet (name) (concat "hi " name))"#
        );
    }
}
