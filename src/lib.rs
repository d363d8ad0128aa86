// Declare modules publicly so they are part of the library interface
pub mod cli;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;

pub use environment::{Environment, NativeTable};
pub use evaluator::{EvalError, EvalResult, Evaluator};
pub use interpreter::{Config, Error, Interpreter};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_program, parse_str};
pub use source::Span;
pub use types::{Expr, Lambda, NativeFunction, Node, Procedure, Value};
