// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use warden_error::ExpressionError;

/// A named function callable from a matcher.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, ExpressionError> + Send + Sync>;

/// Explicit table of matcher functions.
///
/// Each enforcer owns its own table, so engines with different function sets
/// coexist in one process.
#[derive(Clone, Default)]
pub struct FunctionMap {
    fns: HashMap<String, Function>,
}

impl FunctionMap {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace `name`.
    pub fn add_function(&mut self, name: impl Into<String>, function: Function) {
        self.fns.insert(name.into(), function);
    }

    /// Register or replace `name` from a closure.
    pub fn add_fn<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, ExpressionError> + Send + Sync + 'static,
    {
        self.add_function(name, Arc::new(function));
    }

    /// Look up `name`.
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.fns.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    /// Call `name` with `args`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExpressionError> {
        match self.fns.get(name) {
            Some(f) => f(args),
            None => Err(ExpressionError::UnknownFunction(name.to_string())),
        }
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionMap")
            .field("functions", &self.names())
            .finish()
    }
}

/// Fail unless exactly `n` arguments were supplied.
pub fn expect_args(name: &str, args: &[Value], n: usize) -> Result<(), ExpressionError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(ExpressionError::ArgumentCount {
            name: name.to_string(),
            expected: n.to_string(),
            got: args.len(),
        })
    }
}

/// Borrow argument `i` as a string.
pub fn str_arg<'a>(name: &str, args: &'a [Value], i: usize) -> Result<&'a str, ExpressionError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(ExpressionError::TypeMismatch {
            op: name.to_string(),
            detail: format!("argument {} must be a string, got {}", i + 1, other.type_name()),
        }),
        None => Err(ExpressionError::ArgumentCount {
            name: name.to_string(),
            expected: format!("at least {}", i + 1),
            got: args.len(),
        }),
    }
}
