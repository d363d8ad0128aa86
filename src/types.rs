use crate::{evaluator::EvalResult, source::Span};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Expr, // The parsed expression
    pub span: Span, // The source span it covers
}

impl Node {
    pub fn new(kind: Expr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Parsed-but-not-yet-evaluated expression tree.
///
/// `String` and `Symbol` stay distinct all the way into the evaluator, so a
/// quoted `"x"` and a bare `x` are never confused by shape alone.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Boolean(bool),
    String(String),  // Quote-delimited in source, quotes stripped
    Symbol(String),  // Bare identifier text
    List(Vec<Node>), // Possibly empty
}

impl Expr {
    pub fn type_name(&self) -> &'static str {
        match self {
            Expr::Number(_) => "number",
            Expr::Boolean(_) => "boolean",
            Expr::String(_) => "string",
            Expr::Symbol(_) => "symbol",
            Expr::List(_) => "list",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write_number(f, *n),
            Expr::Boolean(b) => write!(f, "{}", if *b { "t" } else { "nil" }),
            Expr::String(s) => write!(f, "\"{}\"", s),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::List(list) => write_list(f, list),
        }
    }
}

/// Runtime result of evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil, // The null-equivalent: empty `car`, unmatched `cond`, missing arguments
    Number(f64),
    Boolean(bool),
    String(String),
    List(Vec<Value>),
    Procedure(Procedure),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Procedure(_) => "procedure",
        }
    }

    /// Host truthiness: `nil`, `false`, `0`, `NaN` and `""` are false,
    /// everything else (the empty list included) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Procedure(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Data view of an unevaluated expression, as produced by `quote`.
    /// Symbols become strings.
    pub fn from_expr(node: &Node) -> Value {
        match &node.kind {
            Expr::Number(n) => Value::Number(*n),
            Expr::Boolean(b) => Value::Boolean(*b),
            Expr::String(s) | Expr::Symbol(s) => Value::String(s.clone()),
            Expr::List(nodes) => Value::List(nodes.iter().map(Value::from_expr).collect()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Number(n) => write_number(f, *n),
            Value::Boolean(b) => write!(f, "{}", if *b { "t" } else { "nil" }),
            Value::String(str) => {
                write!(
                    f,
                    "\"{}\"",
                    str.chars().fold(String::new(), |mut acc, char| {
                        match char {
                            '"' => acc.push_str("\\\""),
                            '\n' => acc.push_str("\\n"),
                            '\r' => acc.push_str("\\r"),
                            '\t' => acc.push_str("\\t"),
                            c => acc.push(c),
                        }
                        acc
                    })
                )
            }
            Value::List(items) => write_list(f, items),
            Value::Procedure(procedure) => write!(f, "{}", procedure),
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{}", n)
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

/// Signature shared by built-ins and host-registered natives. Arguments are
/// already evaluated; `span` is the span of the whole call.
pub type NativeFunc = dyn Fn(Vec<Value>, Span) -> EvalResult<Value>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub func: Rc<NativeFunc>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<Value>, Span) -> EvalResult<Value> + 'static,
    {
        NativeFunction {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: Vec<Value>, span: Span) -> EvalResult<Value> {
        (self.func)(args, span)
    }
}

/// A user-defined function. It owns parameter names and body only; free
/// variables resolve against the shared environment at call time.
#[derive(Debug, PartialEq)]
pub struct Lambda {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub source: usize, // Which evaluated source text the body's spans index into
}

#[derive(Clone)]
pub enum Procedure {
    Native(NativeFunction),
    Lambda(Rc<Lambda>),
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Native(native) => write!(f, "Native({})", native.name),
            Procedure::Lambda(lambda) => write!(f, "Lambda({:?})", lambda.params),
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Native(native) => write!(f, "#<native:{}>", native.name),
            Procedure::Lambda(lambda) => match &lambda.name {
                Some(name) => write!(f, "#<lambda:{}>", name),
                None => write!(f, "#<lambda>"),
            },
        }
    }
}

// Procedures compare by identity only.
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Native(a), Procedure::Native(b)) => Rc::ptr_eq(&a.func, &b.func),
            (Procedure::Lambda(a), Procedure::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
