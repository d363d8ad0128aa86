use crate::types::{NativeFunction, Value};
use crate::evaluator::EvalResult;
use crate::source::Span;
use std::collections::{HashMap, HashSet};

// --- Environment Definition ---

/// The single symbol-to-value mapping shared by every evaluation of one
/// interpreter. There are no nested frames: closures and `let` overlay
/// bindings in place and roll back with [`Environment::restore`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

/// A copy of all bindings, taken before a closure call or `let` body.
#[derive(Debug, Clone)]
pub struct Snapshot(HashMap<String, Value>);

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Binds `name`, replacing any existing binding.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.bindings.clone())
    }

    /// Rolls every binding back to `snapshot`, dropping names defined since.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.bindings = snapshot.0;
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Gets a list of all identifiers in the environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        self.bindings.keys().cloned().collect()
    }
}

// --- Native Function Table ---

/// Name-to-native mapping consulted first at call sites. Disjoint from the
/// [`Environment`].
#[derive(Clone, Default)]
pub struct NativeTable {
    functions: HashMap<String, NativeFunction>,
}

impl NativeTable {
    pub fn new() -> Self {
        NativeTable::default()
    }

    pub fn new_populated() -> Self {
        let mut table = NativeTable::new();

        table.add_primitive("+", crate::primitives::prim_add);
        table.add_primitive("-", crate::primitives::prim_sub);
        table.add_primitive("*", crate::primitives::prim_mul);
        table.add_primitive("/", crate::primitives::prim_div);

        table.add_primitive("=", crate::primitives::prim_equals);
        table.add_primitive("<", crate::primitives::prim_less_than);
        table.add_primitive("<=", crate::primitives::prim_less_than_or_equals);
        table.add_primitive(">", crate::primitives::prim_greater_than);
        table.add_primitive(">=", crate::primitives::prim_greater_than_or_equals);

        table.add_primitive("list", crate::primitives::prim_list);
        table.add_primitive("car", crate::primitives::prim_car);
        table.add_primitive("cdr", crate::primitives::prim_cdr);
        table.add_primitive("cons", crate::primitives::prim_cons);
        table.add_primitive("length", crate::primitives::prim_length);

        // Plain natives, so every argument is evaluated before the choice.
        table.add_primitive("if", crate::primitives::prim_if);
        table.add_primitive("cond", crate::primitives::prim_cond);

        table.add_primitive("and", crate::primitives::prim_and);
        table.add_primitive("or", crate::primitives::prim_or);
        table.add_primitive("not", crate::primitives::prim_not);
        table
    }

    /// Inserts `function` under its name. Returns the entry it replaced.
    pub fn register(&mut self, function: NativeFunction) -> Option<NativeFunction> {
        self.functions.insert(function.name.clone(), function)
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get_identifiers(&self) -> HashSet<String> {
        self.functions.keys().cloned().collect()
    }

    fn add_primitive(&mut self, name: &str, func: fn(Vec<Value>, Span) -> EvalResult<Value>) {
        self.register(NativeFunction::new(name, func));
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x".to_string(), Value::Number(10.0));

        assert_eq!(env.get("x"), Some(&Value::Number(10.0)));
        assert_eq!(env.get("y"), None);
        assert!(env.contains("x"));
    }

    #[test]
    fn test_define_overwrites() {
        let mut env = Environment::new();
        env.define("x".to_string(), Value::Number(1.0));
        env.define("x".to_string(), Value::from("two"));

        assert_eq!(env.get("x"), Some(&Value::from("two")));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut env = Environment::new();
        env.define("x".to_string(), Value::Number(1.0));
        let snapshot = env.snapshot();

        env.define("x".to_string(), Value::Number(2.0));
        env.define("y".to_string(), Value::Number(3.0));
        assert_eq!(env.get("x"), Some(&Value::Number(2.0)));

        env.restore(snapshot);
        assert_eq!(env.get("x"), Some(&Value::Number(1.0)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn test_populated_table_has_builtins() {
        let table = NativeTable::new_populated();
        for name in [
            "+", "-", "*", "/", "=", ">", "<", ">=", "<=", "list", "car", "cdr", "cons",
            "length", "if", "cond", "and", "or", "not",
        ] {
            assert!(table.contains(name), "missing builtin {}", name);
        }
        assert!(!table.contains("setq"));
    }

    #[test]
    fn test_register_overwrites_silently() {
        let mut table = NativeTable::new_populated();
        let previous = table.register(NativeFunction::new("+", |_, _| Ok(Value::from("plus"))));
        assert!(previous.is_some());

        let plus = table.get("+").unwrap();
        assert_eq!(plus.call(vec![], Span::default()), Ok(Value::from("plus")));
    }
}
