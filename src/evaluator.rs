use crate::environment::{Environment, NativeTable};
use crate::source::Span;
use crate::types::{Expr, Lambda, Node, Procedure, Value};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Undefined symbol: {0}")]
    UndefinedSymbol(String, Span),
    #[error("{0} is not a function")]
    NotCallable(String, Span), // Display form of the callee expression
    #[error("Invalid arguments - {0}")]
    InvalidArguments(String, Span), // Natives: wrong arity or argument type
    #[error("Invalid special form - {0}")]
    InvalidSpecialForm(String, Span),
    #[error("Maximum evaluation depth of {0} exceeded")]
    RecursionLimit(usize, Span),
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::UndefinedSymbol(_, span)
            | EvalError::NotCallable(_, span)
            | EvalError::InvalidArguments(_, span)
            | EvalError::InvalidSpecialForm(_, span)
            | EvalError::RecursionLimit(_, span) => *span,
        }
    }

    /// Same error, relocated to `span`.
    pub fn with_span(self, span: Span) -> Self {
        match self {
            EvalError::UndefinedSymbol(name, _) => EvalError::UndefinedSymbol(name, span),
            EvalError::NotCallable(expr, _) => EvalError::NotCallable(expr, span),
            EvalError::InvalidArguments(message, _) => EvalError::InvalidArguments(message, span),
            EvalError::InvalidSpecialForm(message, _) => {
                EvalError::InvalidSpecialForm(message, span)
            }
            EvalError::RecursionLimit(depth, _) => EvalError::RecursionLimit(depth, span),
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

const SPECIAL_FORMS: [&str; 6] = ["quote", "setq", "set", "defun", "lambda", "let"];

pub fn special_form_identifiers() -> HashSet<String> {
    SPECIAL_FORMS.iter().map(|s| s.to_string()).collect()
}

/// Walks expression trees against one shared environment and the native
/// table. One `Evaluator` lives for one top-level expression.
///
/// Spans only make sense next to the text they were parsed from, so the
/// evaluator tracks which source the node under evaluation belongs to.
/// Errors escaping a closure defined in another source are moved onto the
/// call site.
pub struct Evaluator<'a> {
    env: &'a mut Environment,
    natives: &'a NativeTable,
    depth: usize,
    max_depth: usize,
    source: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a mut Environment, natives: &'a NativeTable, max_depth: usize) -> Self {
        Evaluator {
            env,
            natives,
            depth: 0,
            max_depth,
            source: 0,
        }
    }

    /// Sets the id of the source text the evaluated nodes were parsed from.
    pub fn with_source(mut self, source: usize) -> Self {
        self.source = source;
        self
    }

    /// Evaluates a given AST Node.
    pub fn evaluate(&mut self, node: &Node) -> EvalResult {
        if self.depth >= self.max_depth {
            return Err(EvalError::RecursionLimit(self.max_depth, node.span));
        }
        self.depth += 1;
        let result = self.evaluate_node(node);
        self.depth -= 1;
        result
    }

    fn evaluate_node(&mut self, node: &Node) -> EvalResult {
        match &node.kind {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),

            // A bound variable wins over the literal text.
            Expr::String(text) => Ok(self
                .env
                .get(text)
                .cloned()
                .unwrap_or_else(|| Value::String(text.clone()))),

            Expr::Symbol(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedSymbol(name.clone(), node.span)),

            Expr::List(elements) => match &elements[..] {
                [] => Ok(Value::List(vec![])),
                [first, rest @ ..] => match first.as_symbol() {
                    Some("quote") => evaluate_quote(rest, node.span),
                    Some("setq" | "set") => self.evaluate_setq(rest, node.span),
                    Some("defun") => self.evaluate_defun(rest, node.span),
                    Some("lambda") => self.evaluate_lambda(rest, node.span),
                    Some("let") => self.evaluate_let(rest, node.span),
                    _ => self.evaluate_procedure(first, rest, node.span),
                },
            },
        }
    }

    fn evaluate_procedure(&mut self, operator: &Node, operands: &[Node], span: Span) -> EvalResult {
        // 1. Native table first, then the operator's value
        let natives = self.natives;
        let procedure = match operator.as_symbol().and_then(|name| natives.get(name)) {
            Some(native) => Procedure::Native(native.clone()),
            None => match self.evaluate(operator)? {
                Value::Procedure(procedure) => procedure,
                _ => {
                    return Err(EvalError::NotCallable(operator.to_string(), operator.span));
                }
            },
        };

        // 2. Every operand, left to right, no matter what the callee does with it
        let mut evaluated_args: Vec<Value> = Vec::with_capacity(operands.len());
        for operand_node in operands {
            evaluated_args.push(self.evaluate(operand_node)?);
        }

        // 3. Apply
        self.apply(&procedure, evaluated_args, span)
    }

    /// Calls `procedure` with already-evaluated arguments.
    pub fn apply(&mut self, procedure: &Procedure, args: Vec<Value>, span: Span) -> EvalResult {
        match procedure {
            Procedure::Native(native) => native.call(args, span),
            Procedure::Lambda(lambda) => {
                let caller = std::mem::replace(&mut self.source, lambda.source);
                let result = self.apply_lambda(lambda, args);
                self.source = caller;
                if caller == lambda.source {
                    result
                } else {
                    result.map_err(|err| err.with_span(span))
                }
            }
        }
    }

    fn apply_lambda(&mut self, lambda: &Lambda, args: Vec<Value>) -> EvalResult {
        log::trace!(
            "calling {} with {} argument(s)",
            lambda.name.as_deref().unwrap_or("lambda"),
            args.len()
        );
        let snapshot = self.env.snapshot();
        let mut args = args.into_iter();
        for param in &lambda.params {
            // Missing arguments bind to nil, surplus ones are dropped.
            let value = args.next().unwrap_or(Value::Nil);
            self.env.define(param.clone(), value);
        }
        let result = self.evaluate_body(&lambda.body);
        self.env.restore(snapshot);
        result
    }

    fn evaluate_body(&mut self, body: &[Node]) -> EvalResult {
        let mut result = Value::Nil;
        for expr in body {
            result = self.evaluate(expr)?;
        }
        Ok(result)
    }

    fn evaluate_setq(&mut self, operands: &[Node], span: Span) -> EvalResult {
        match operands {
            [target, value_expr] => {
                let name = expect_symbol(target, "setq")?;
                let value = self.evaluate(value_expr)?;
                log::trace!("setq {} = {}", name, value);
                self.env.define(name.to_string(), value.clone());
                Ok(value)
            }
            _ => Err(EvalError::InvalidSpecialForm(
                "setq expects a symbol and a value".to_string(),
                span,
            )),
        }
    }

    fn evaluate_defun(&mut self, operands: &[Node], span: Span) -> EvalResult {
        match operands {
            [name_node, params, body @ ..] => {
                let name = expect_symbol(name_node, "defun")?;
                let lambda = Lambda {
                    name: Some(name.to_string()),
                    params: parse_params(params, "defun")?,
                    body: body.to_vec(),
                    source: self.source,
                };
                log::debug!("defun {} ({})", name, lambda.params.join(" "));
                let value = Value::Procedure(Procedure::Lambda(Rc::new(lambda)));
                self.env.define(name.to_string(), value.clone());
                Ok(value)
            }
            _ => Err(EvalError::InvalidSpecialForm(
                "defun expects a name, a parameter list and a body".to_string(),
                span,
            )),
        }
    }

    fn evaluate_lambda(&mut self, operands: &[Node], span: Span) -> EvalResult {
        match operands {
            [params, body @ ..] => Ok(Value::Procedure(Procedure::Lambda(Rc::new(Lambda {
                name: None,
                params: parse_params(params, "lambda")?,
                body: body.to_vec(),
                source: self.source,
            })))),
            _ => Err(EvalError::InvalidSpecialForm(
                "lambda expects a parameter list and a body".to_string(),
                span,
            )),
        }
    }

    /// Bindings are evaluated in order against the environment as it is being
    /// updated, so later ones see earlier ones.
    fn evaluate_let(&mut self, operands: &[Node], span: Span) -> EvalResult {
        let [bindings, body @ ..] = operands else {
            return Err(EvalError::InvalidSpecialForm(
                "let expects a binding list and a body".to_string(),
                span,
            ));
        };
        let Expr::List(bindings) = &bindings.kind else {
            return Err(EvalError::InvalidSpecialForm(
                format!("let expects a list of bindings, got {}", bindings.kind.type_name()),
                bindings.span,
            ));
        };

        let snapshot = self.env.snapshot();
        let result = self
            .bind_let(bindings)
            .and_then(|()| self.evaluate_body(body));
        self.env.restore(snapshot);
        result
    }

    fn bind_let(&mut self, bindings: &[Node]) -> EvalResult<()> {
        for binding in bindings {
            match &binding.kind {
                Expr::List(pair) if pair.len() >= 2 => {
                    let name = expect_symbol(&pair[0], "let")?;
                    let value = self.evaluate(&pair[1])?;
                    log::trace!("let {} = {}", name, value);
                    self.env.define(name.to_string(), value);
                }
                _ => {
                    return Err(EvalError::InvalidSpecialForm(
                        format!("let binding must be (symbol value), got {}", binding),
                        binding.span,
                    ));
                }
            }
        }
        Ok(())
    }
}

fn evaluate_quote(operands: &[Node], span: Span) -> EvalResult {
    if let [node] = operands {
        Ok(Value::from_expr(node))
    } else {
        Err(EvalError::InvalidSpecialForm(
            "quote expects exactly one argument".to_string(),
            span, // Use the span of the whole (quote ...) form
        ))
    }
}

fn expect_symbol<'n>(node: &'n Node, form: &str) -> EvalResult<&'n str> {
    node.as_symbol().ok_or_else(|| {
        EvalError::InvalidSpecialForm(
            format!("{} expects a symbol, got {}", form, node.kind.type_name()),
            node.span,
        )
    })
}

fn parse_params(params: &Node, form: &str) -> EvalResult<Vec<String>> {
    match &params.kind {
        Expr::List(nodes) => nodes
            .iter()
            .map(|node| expect_symbol(node, form).map(str::to_string))
            .collect(),
        other => Err(EvalError::InvalidSpecialForm(
            format!("{} expects a parameter list, got {}", form, other.type_name()),
            params.span,
        )),
    }
}
