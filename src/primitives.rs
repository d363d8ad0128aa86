use crate::{EvalError, EvalResult, Span, Value};

// Checks the number of arguments
macro_rules! check_arity {
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

// Extracts a number from a Value or returns an InvalidArguments error
macro_rules! expect_number {
    ($value:expr, $span:expr, $name:expr, $arg_pos:expr) => {
        match $value {
            Value::Number(n) => *n,
            other => {
                return Err(EvalError::InvalidArguments(
                    format!(
                        "Primitive '{}' expects a number for argument {}, got {}",
                        $name,
                        $arg_pos,
                        other.type_name()
                    ),
                    $span,
                ));
            }
        }
    };
}

fn wrong_type(name: &str, expected: &str, found: &Value, span: Span) -> EvalError {
    EvalError::InvalidArguments(
        format!(
            "Primitive '{}' expects {}, got {}",
            name,
            expected,
            found.type_name()
        ),
        span,
    )
}

fn fold_numbers<F: Fn(f64, f64) -> f64>(
    args: &[Value],
    span: Span,
    start: f64,
    func: F,
    operator: &str,
) -> EvalResult {
    let mut acc = start;
    for (i, value) in args.iter().enumerate() {
        let num = expect_number!(value, span, operator, i + 1);
        acc = func(acc, num);
    }
    Ok(Value::Number(acc))
}

// First operand folded over the rest; a single operand is returned as-is.
fn fold_from_first<F: Fn(f64, f64) -> f64>(
    args: &[Value],
    span: Span,
    func: F,
    operator: &str,
) -> EvalResult {
    check_arity!(args, min 1, span, operator);
    let first = expect_number!(&args[0], span, operator, 1);
    let mut acc = first;
    for (i, value) in args.iter().enumerate().skip(1) {
        let num = expect_number!(value, span, operator, i + 1);
        acc = func(acc, num);
    }
    Ok(Value::Number(acc))
}

pub fn prim_add(args: Vec<Value>, span: Span) -> EvalResult {
    // (+) -> 0
    // (+ 1 2 3) -> 6
    fold_numbers(&args, span, 0.0, |acc, val| acc + val, "+")
}

pub fn prim_sub(args: Vec<Value>, span: Span) -> EvalResult {
    // (- x) -> x
    // (- x y z) -> x - y - z
    fold_from_first(&args, span, |acc, val| acc - val, "-")
}

pub fn prim_mul(args: Vec<Value>, span: Span) -> EvalResult {
    // (*) -> 1
    // (* 1 2 3) -> 6
    fold_numbers(&args, span, 1.0, |acc, val| acc * val, "*")
}

pub fn prim_div(args: Vec<Value>, span: Span) -> EvalResult {
    // (/ x y z) -> x / y / z, IEEE-754 on zero divisors
    fold_from_first(&args, span, |acc, val| acc / val, "/")
}

// --- Comparison ---

fn compare_numbers<F: Fn(f64, f64) -> bool>(
    args: &[Value],
    span: Span,
    compare: F,
    operator: &str,
) -> EvalResult {
    // (< a b) -> boolean; operands past the second are ignored
    check_arity!(args, min 2, span, operator);
    let left = expect_number!(&args[0], span, operator, 1);
    let right = expect_number!(&args[1], span, operator, 2);
    Ok(Value::Boolean(compare(left, right)))
}

pub fn prim_equals(args: Vec<Value>, span: Span) -> EvalResult {
    // Strict: same kind and same payload. Extra operands are ignored.
    check_arity!(args, min 2, span, "=");
    Ok(Value::Boolean(args[0] == args[1]))
}

pub fn prim_less_than(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(&args, span, |left, right| left < right, "<")
}

pub fn prim_less_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(&args, span, |left, right| left <= right, "<=")
}

pub fn prim_greater_than(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(&args, span, |left, right| left > right, ">")
}

pub fn prim_greater_than_or_equals(args: Vec<Value>, span: Span) -> EvalResult {
    compare_numbers(&args, span, |left, right| left >= right, ">=")
}

// --- List Primitives ---

pub fn prim_list(args: Vec<Value>, _span: Span) -> EvalResult {
    Ok(Value::List(args))
}

pub fn prim_car(args: Vec<Value>, span: Span) -> EvalResult {
    // (car list) -> first item, nil when empty or absent
    // `nil` reads as Boolean(false) and stands for the empty list here.
    match args.into_iter().next() {
        None | Some(Value::Nil | Value::Boolean(false)) => Ok(Value::Nil),
        Some(Value::List(items)) => Ok(items.into_iter().next().unwrap_or(Value::Nil)),
        Some(other) => Err(wrong_type("car", "a list", &other, span)),
    }
}

pub fn prim_cdr(args: Vec<Value>, span: Span) -> EvalResult {
    // (cdr list) -> rest of list, () when empty or absent
    match args.into_iter().next() {
        None | Some(Value::Nil | Value::Boolean(false)) => Ok(Value::List(vec![])),
        Some(Value::List(items)) => Ok(Value::List(items.into_iter().skip(1).collect())),
        Some(other) => Err(wrong_type("cdr", "a list", &other, span)),
    }
}

pub fn prim_cons(args: Vec<Value>, span: Span) -> EvalResult {
    // (cons item list) -> (item . list)
    let mut args = args.into_iter();
    let item = args.next().unwrap_or(Value::Nil);
    match args.next() {
        None | Some(Value::Nil | Value::Boolean(false)) => Ok(Value::List(vec![item])),
        Some(Value::List(mut items)) => {
            items.insert(0, item);
            Ok(Value::List(items))
        }
        Some(other) => Err(wrong_type("cons", "a list as argument 2", &other, span)),
    }
}

pub fn prim_length(args: Vec<Value>, span: Span) -> EvalResult {
    match args.first() {
        None | Some(Value::Nil | Value::Boolean(false)) => Ok(Value::Number(0.0)),
        Some(Value::List(items)) => Ok(Value::Number(items.len() as f64)),
        Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),
        Some(other) => Err(wrong_type("length", "a list or string", other, span)),
    }
}

// --- Control ---
// Both receive already-evaluated branches; they only pick one.

pub fn prim_if(args: Vec<Value>, _span: Span) -> EvalResult {
    // (if cond then else)
    let mut args = args.into_iter();
    let condition = args.next().unwrap_or(Value::Nil);
    let then_value = args.next().unwrap_or(Value::Nil);
    let else_value = args.next().unwrap_or(Value::Nil);
    Ok(if condition.is_truthy() {
        then_value
    } else {
        else_value
    })
}

pub fn prim_cond(args: Vec<Value>, _span: Span) -> EvalResult {
    // (cond (list test value) ...) -> value of the first truthy test
    for clause in args {
        if let Value::List(items) = clause {
            if items.len() >= 2 && items[0].is_truthy() {
                return Ok(items.into_iter().nth(1).unwrap_or(Value::Nil));
            }
        }
    }
    Ok(Value::Nil)
}

// --- Logical ---

pub fn prim_and(args: Vec<Value>, _span: Span) -> EvalResult {
    Ok(Value::Boolean(args.iter().all(Value::is_truthy)))
}

pub fn prim_or(args: Vec<Value>, _span: Span) -> EvalResult {
    Ok(Value::Boolean(args.iter().any(Value::is_truthy)))
}

pub fn prim_not(args: Vec<Value>, _span: Span) -> EvalResult {
    Ok(Value::Boolean(!args.first().is_some_and(Value::is_truthy)))
}
