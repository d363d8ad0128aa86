use crate::environment::{Environment, NativeTable};
use crate::evaluator::{EvalError, EvalResult, Evaluator, special_form_identifiers};
use crate::lexer::tokenize;
use crate::parser::{ParseError, Parser};
use crate::source::Span;
use crate::types::{NativeFunction, Node, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Anything `Interpreter::evaluate` can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Error::Syntax(_))
    }

    pub fn is_undefined_symbol(&self) -> bool {
        matches!(self, Error::Eval(EvalError::UndefinedSymbol(..)))
    }

    pub fn is_not_callable(&self) -> bool {
        matches!(self, Error::Eval(EvalError::NotCallable(..)))
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Syntax(err) => err.span(),
            Error::Eval(err) => Some(err.span()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Deepest nesting of evaluations before `RecursionLimit` is raised.
    pub max_depth: usize,
}

impl Default for Config {
    // Fits in a 2 MiB thread stack even for unoptimised builds.
    fn default() -> Self {
        Config { max_depth: 128 }
    }
}

impl Config {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// One interpreter instance: a shared environment plus a native function
/// table, both living as long as the instance.
///
/// Not thread-safe; hosts serialise calls into a single instance.
pub struct Interpreter {
    env: Environment,
    natives: NativeTable,
    config: Config,
    sources: usize, // Source texts evaluated so far; the next one gets this id
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Interpreter {
            env: Environment::new(),
            natives: NativeTable::new_populated(),
            config,
            sources: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parses and evaluates every top-level expression of `source` in order
    /// and returns the value of the last one (`nil` for empty input).
    ///
    /// Each expression is parsed only once the previous one has run, so a
    /// failure in expression N leaves the effects of 1..N-1 in place and
    /// skips the rest.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, Error> {
        let tokens = tokenize(source).map_err(ParseError::from)?;
        let source_id = self.next_source();
        let mut parser = Parser::new(tokens);
        let mut last = Value::Nil;
        while parser.has_more() {
            let node = parser.parse_expr()?;
            last = self.run(&node, source_id)?;
        }
        Ok(last)
    }

    /// Evaluates an already-parsed expression. Each call counts as a source
    /// text of its own when errors are located.
    pub fn evaluate_node(&mut self, node: &Node) -> EvalResult {
        let source_id = self.next_source();
        self.run(node, source_id)
    }

    fn next_source(&mut self) -> usize {
        self.sources += 1;
        self.sources
    }

    fn run(&mut self, node: &Node, source_id: usize) -> EvalResult {
        log::debug!("evaluating {}", node);
        let result = Evaluator::new(&mut self.env, &self.natives, self.config.max_depth)
            .with_source(source_id)
            .evaluate(node);
        if let Err(err) = &result {
            log::debug!("evaluation failed: {}", err);
        }
        result
    }

    /// Adds or replaces a native function. Only evaluations that happen
    /// afterwards see it.
    pub fn register_function<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Vec<Value>, Span) -> EvalResult<Value> + 'static,
    {
        let native = NativeFunction::new(name, func);
        let name = native.name.clone();
        if self.natives.register(native).is_some() {
            log::warn!("native function `{}` replaced", name);
        } else {
            log::debug!("native function `{}` registered", name);
        }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.natives.contains(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        log::trace!("host set {} = {}", name, value);
        self.env.define(name, value);
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.env.get(name).cloned()
    }

    /// Every name the REPL can complete: variables, natives and special forms.
    pub fn identifiers(&self) -> HashSet<String> {
        let mut identifiers = self.env.get_identifiers();
        identifiers.extend(self.natives.get_identifiers());
        identifiers.extend(special_form_identifiers());
        identifiers
    }
}
