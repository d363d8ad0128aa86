use crate::{Error, EvalError, ParseError, Span};
use ariadne::{Config, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type SourceSpan<'a> = (&'a str, Range<usize>);

impl EvalError {
    pub fn report<'a>(&self, source_name: &'a str, config: Config) -> Report<'a, SourceSpan<'a>> {
        let range = self.span().to_range();
        let builder =
            Report::build(ReportKind::Error, (source_name, range.clone())).with_config(config);
        let label = Label::new((source_name, range));
        match self {
            EvalError::UndefinedSymbol(symbol, _) => builder
                .with_message(format!("Undefined symbol `{}`", symbol))
                .with_label(label.with_message("This symbol has no binding")),
            EvalError::NotCallable(expr, _) => builder
                .with_message(format!("Not a function: {}", expr))
                .with_label(label.with_message("This expression cannot be called as a function")),
            EvalError::InvalidArguments(message, _) => builder
                .with_message("Invalid arguments:")
                .with_label(label.with_message(message)),
            EvalError::InvalidSpecialForm(message, _) => builder
                .with_message(format!("Invalid special form: {}", message))
                .with_label(label.with_message("This special form is malformed or incomplete")),
            EvalError::RecursionLimit(depth, _) => builder
                .with_message(format!("Evaluation nested deeper than {}", depth))
                .with_label(label.with_message("Limit reached while evaluating this")),
        }
        .finish()
    }
}

impl ParseError {
    pub fn report<'a>(
        &self,
        source_name: &'a str,
        input: &str,
        config: Config,
    ) -> Report<'a, SourceSpan<'a>> {
        // No span for EOF errors: point just past the input.
        let end = input.len();
        let range = self.span().unwrap_or(Span::new(end, end)).to_range();
        let builder =
            Report::build(ReportKind::Error, (source_name, range.clone())).with_config(config);
        let label = Label::new((source_name, range));
        match self {
            ParseError::UnexpectedEof => builder
                .with_message("Unexpected end of input")
                .with_label(label.with_message("Expected an expression")),
            ParseError::UnmatchedOpenParen(_) => builder
                .with_message("Unmatched opening parenthesis")
                .with_label(label.with_message("This '(' is never closed")),
            ParseError::UnexpectedCloseParen(_) => builder
                .with_message("Unexpected closing parenthesis")
                .with_label(label.with_message("No '(' matches this")),
            ParseError::NestingTooDeep(depth, _) => builder
                .with_message(format!("Lists nested deeper than {}", depth))
                .with_label(label.with_message("This list is one level too deep")),
            ParseError::LexerError(lex_err) => builder
                .with_message("Lexer Error")
                .with_label(label.with_message(lex_err.error.to_string())),
        }
        .finish()
    }
}

impl Error {
    pub fn report<'a>(
        &self,
        source_name: &'a str,
        input: &str,
        config: Config,
    ) -> Report<'a, SourceSpan<'a>> {
        match self {
            Error::Syntax(err) => err.report(source_name, input, config),
            Error::Eval(err) => err.report(source_name, config),
        }
    }

    /// Renders the error against `input` on stderr.
    pub fn pretty_print(&self, source_name: &str, input: &str) -> io::Result<()> {
        self.report(source_name, input, Config::default())
            .eprint((source_name, Source::from(input)))
    }

    /// Renders the error against `input` into a string, without colours.
    pub fn render(&self, source_name: &str, input: &str) -> String {
        let mut buffer = Vec::new();
        let config = Config::default().with_color(false);
        match self
            .report(source_name, input, config)
            .write((source_name, Source::from(input)), &mut buffer)
        {
            Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
