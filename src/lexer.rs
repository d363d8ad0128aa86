use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// Lexical tokens. Everything that is not a paren or whitespace
/// accumulates into an `Atom`; a `"` switches to a quoted stretch that
/// swallows parens, semicolons and whitespace until the closing `"` (or the
/// end of input). No escape sequences are recognised.
///
/// A comment inside an atom is dropped without ending it, so `abc;x\ndef`
/// is the single atom `abcdef`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(skip r";[^\n]*\n?")] // Skip comments, newline included
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(
        r#"([^ \t\n\r();"]|"[^"]*"?)([^ \t\n\r();"]|"[^"]*"?|;[^\n]*\n?)*"#,
        |lex| strip_comments(lex.slice())
    )]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Error)]
pub enum LexerErrorKind {
    #[default]
    #[error("Invalid Token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

type LexerRangedResult<T> = Result<T, LexerError>;

// Removes `;` comments (newline included) that sit outside quoted stretches.
fn strip_comments(slice: &str) -> String {
    let mut text = String::with_capacity(slice.len());
    let mut in_string = false;
    let mut in_comment = false;
    for c in slice.chars() {
        if in_comment {
            in_comment = c != '\n';
        } else if c == ';' && !in_string {
            in_comment = true;
        } else {
            in_string ^= c == '"';
            text.push(c);
        }
    }
    text
}

/// Splits `input` into the flat token sequence the parser consumes front to
/// back. Unterminated strings and comments at end of input are flushed, not
/// reported.
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| match result {
            Ok(kind) => Ok(Token {
                kind,
                span: range.into(),
            }),
            Err(error) => Err(LexerError {
                error,
                span: range.into(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn atom(s: &str) -> TokenKind {
        TokenKind::Atom(s.to_string())
    }

    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        match tokenize(input) {
            Ok(tokens) => {
                let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
                assert_eq!(kinds, expected, "Input: '{}'", input);
            }
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e),
        }
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("   \n\t ", vec![]);
    }

    #[test]
    fn test_parentheses() {
        assert_tokens("()", vec![TokenKind::LParen, TokenKind::RParen]);
        assert_tokens("( )", vec![TokenKind::LParen, TokenKind::RParen]);
        assert_tokens(
            "(a)(b)",
            vec![
                TokenKind::LParen,
                atom("a"),
                TokenKind::RParen,
                TokenKind::LParen,
                atom("b"),
                TokenKind::RParen,
            ],
        );
    }

    #[test]
    fn test_parens_break_pending_atom() {
        assert_tokens(
            "foo(bar)baz",
            vec![
                atom("foo"),
                TokenKind::LParen,
                atom("bar"),
                TokenKind::RParen,
                atom("baz"),
            ],
        );
    }

    #[test]
    fn test_atoms_are_raw_text() {
        assert_tokens(
            "(+ 1 -2.5 t nil foo-bar <=)",
            vec![
                TokenKind::LParen,
                atom("+"),
                atom("1"),
                atom("-2.5"),
                atom("t"),
                atom("nil"),
                atom("foo-bar"),
                atom("<="),
                TokenKind::RParen,
            ],
        );
    }

    #[test]
    fn test_strings_keep_delimiters_and_contents() {
        assert_tokens(r#""hello""#, vec![atom(r#""hello""#)]);
        assert_tokens(
            r#"(msg "a (b) ; c")"#,
            vec![
                TokenKind::LParen,
                atom("msg"),
                atom(r#""a (b) ; c""#),
                TokenKind::RParen,
            ],
        );
        assert_tokens("\"two\nlines\"", vec![atom("\"two\nlines\"")]);
    }

    #[test]
    fn test_no_escape_processing() {
        // The backslash is literal; the second quote closes the string.
        assert_tokens(r#""a\" b"#, vec![atom(r#""a\""#), atom("b")]);
    }

    #[test]
    fn test_quote_toggles_mid_atom() {
        assert_tokens(r#"ab"c d"e f"#, vec![atom(r#"ab"c d"e"#), atom("f")]);
    }

    #[test]
    fn test_comments() {
        let input = "
            (setq x 10) ; Define x
            ; Another comment line
              (+ x 5)  ; Add 5 to x
              ; Final comment";
        assert_tokens(
            input,
            vec![
                TokenKind::LParen,
                atom("setq"),
                atom("x"),
                atom("10"),
                TokenKind::RParen,
                TokenKind::LParen,
                atom("+"),
                atom("x"),
                atom("5"),
                TokenKind::RParen,
            ],
        );
        assert_tokens("; only comment", vec![]);
        assert_tokens(";", vec![]);
    }

    #[test]
    fn test_comment_inside_atom_is_dropped() {
        assert_tokens("abc;comment\ndef", vec![atom("abcdef")]);
        assert_tokens("abc;one\n;two\nd", vec![atom("abcd")]);
        assert_tokens("abc;comment", vec![atom("abc")]);
        assert_tokens(r#"ab;c "d"#, vec![atom("ab")]);
        assert_tokens("abc;x\n(", vec![atom("abc"), TokenKind::LParen]);
        // Whitespace after the comment's newline still ends the atom.
        assert_tokens("abc;x\n def", vec![atom("abc"), atom("def")]);
        assert_tokens("abc ;x\ndef", vec![atom("abc"), atom("def")]);
        // Inside a quoted stretch `;` is ordinary text.
        assert_tokens(r#""a;b" c"#, vec![atom(r#""a;b""#), atom("c")]);

        let tokens = tokenize("abc;x\ndef").unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 9));
    }

    #[test]
    fn test_unterminated_string_is_flushed() {
        assert_tokens(
            r#"(print "oops"#,
            vec![TokenKind::LParen, atom("print"), atom(r#""oops"#)],
        );
        assert_tokens("\"", vec![atom("\"")]);
        assert_tokens("\"a ) ; b\n", vec![atom("\"a ) ; b\n")]);
    }

    #[test]
    fn test_crlf_is_whitespace() {
        assert_tokens("a\r\nb", vec![atom("a"), atom("b")]);
    }

    #[test]
    fn test_tokenize_spans() {
        let input = "(+ 1)";
        let tokens = tokenize(input).expect("Should tokenize successfully");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].span, Span { start: 0, end: 1 });
        assert_eq!(tokens[1].span, Span { start: 1, end: 2 });
        assert_eq!(tokens[2].span, Span { start: 3, end: 4 });
        assert_eq!(tokens[3].span, Span { start: 4, end: 5 });
    }

    #[test]
    fn test_bench_code() {
        let input = r#"
(defun fib (n)
  ; Calculate the nth Fibonacci number
  (if (< n 2)
      n
      (+ (fib (- n 1))
         (fib (- n 2)))))

(fib 10)
(quote ("string with spaces" t nil 123 45.67 -10 +))
        "#;

        match tokenize(input) {
            Ok(tokens) => assert_eq!(tokens.len(), 51, "Input: '{}'", input),
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e),
        }
    }
}
