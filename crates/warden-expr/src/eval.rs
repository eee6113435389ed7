// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tree-walking evaluation.

use crate::function::FunctionMap;
use crate::parser::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use warden_error::ExpressionError;

/// Maximum evaluation recursion, covering long left-nested operator chains.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Variable and function resolution for one evaluation.
pub trait Scope {
    /// Value bound to `name`, `None` when unbound.
    fn variable(&self, name: &str) -> Option<Value>;

    /// Invoke the function `name`.
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExpressionError>;
}

/// A [`Scope`] over a variable map and a [`FunctionMap`].
#[derive(Debug, Clone)]
pub struct MapScope<'a> {
    vars: HashMap<String, Value>,
    functions: &'a FunctionMap,
}

impl<'a> MapScope<'a> {
    /// Scope with no variables.
    pub fn new(functions: &'a FunctionMap) -> Self {
        Self {
            vars: HashMap::new(),
            functions,
        }
    }

    /// Bind `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Scope for MapScope<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExpressionError> {
        self.functions.call(name, args)
    }
}

impl Expr {
    /// Evaluate against `scope`.
    pub fn eval(&self, scope: &dyn Scope) -> Result<Value, ExpressionError> {
        self.eval_at(scope, 0)
    }

    /// Evaluate as a matcher: booleans pass through, numbers match when non-zero.
    pub fn matches(&self, scope: &dyn Scope) -> Result<bool, ExpressionError> {
        match self.eval(scope)? {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Float(f) => Ok(f != 0.0),
            other => Err(ExpressionError::MatcherResult(other.type_name().to_string())),
        }
    }

    fn eval_at(&self, scope: &dyn Scope, depth: usize) -> Result<Value, ExpressionError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(ExpressionError::TooDeep {
                max: MAX_EVAL_DEPTH,
            });
        }
        let next = depth + 1;

        match self {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Var { name, path } => {
                let mut value = scope
                    .variable(name)
                    .ok_or_else(|| ExpressionError::UnknownVariable(name.clone()))?;
                for (i, key) in path.iter().enumerate() {
                    value = match value {
                        Value::Map(mut m) => m.remove(key).ok_or_else(|| {
                            ExpressionError::UnknownVariable(format!(
                                "{name}.{}",
                                path[..=i].join(".")
                            ))
                        })?,
                        other => {
                            return Err(ExpressionError::TypeMismatch {
                                op: ".".into(),
                                detail: format!(
                                    "cannot read attribute `{key}` of {}",
                                    other.type_name()
                                ),
                            });
                        }
                    };
                }
                Ok(value)
            }

            Expr::And(items) => {
                for item in items {
                    if !as_bool("&&", item.eval_at(scope, next)?)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }

            Expr::Or(items) => {
                for item in items {
                    if as_bool("||", item.eval_at(scope, next)?)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }

            Expr::Unary { op, expr } => {
                let v = expr.eval_at(scope, next)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!as_bool("!", v)?)),
                    UnaryOp::Neg => match v {
                        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| overflow("-")),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(mismatch("-", &format!("cannot negate {}", other.type_name()))),
                    },
                }
            }

            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval_at(scope, next)?;
                let r = rhs.eval_at(scope, next)?;
                apply_binary(*op, l, r)
            }

            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval_at(scope, next))
                    .collect::<Result<Vec<_>, _>>()?;
                scope.call(name, &values)
            }

            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|e| e.eval_at(scope, next))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
        }
    }
}

fn mismatch(op: &str, detail: &str) -> ExpressionError {
    ExpressionError::TypeMismatch {
        op: op.to_string(),
        detail: detail.to_string(),
    }
}

fn overflow(op: &str) -> ExpressionError {
    mismatch(op, "integer overflow")
}

fn as_bool(op: &str, v: Value) -> Result<bool, ExpressionError> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(mismatch(
            op,
            &format!("operand must be bool, got {}", other.type_name()),
        )),
    }
}

/// Structural equality with numeric promotion between ints and floats.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        _ => a == b,
    }
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> Result<Ordering, ExpressionError> {
    let ord = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };
    ord.ok_or_else(|| {
        mismatch(
            op.symbol(),
            &format!("cannot order {} and {}", a.type_name(), b.type_name()),
        )
    })
}

fn arithmetic(op: BinaryOp, a: Value, b: Value) -> Result<Value, ExpressionError> {
    let sym = op.symbol();
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        let (x, y) = (*x, *y);
        return match op {
            BinaryOp::Add => x.checked_add(y).map(Value::Int).ok_or_else(|| overflow(sym)),
            BinaryOp::Sub => x.checked_sub(y).map(Value::Int).ok_or_else(|| overflow(sym)),
            BinaryOp::Mul => x.checked_mul(y).map(Value::Int).ok_or_else(|| overflow(sym)),
            BinaryOp::Div if y == 0 => Err(mismatch(sym, "division by zero")),
            BinaryOp::Div => Ok(Value::Float(x as f64 / y as f64)),
            BinaryOp::Rem if y == 0 => Err(mismatch(sym, "division by zero")),
            _ => x.checked_rem(y).map(Value::Int).ok_or_else(|| overflow(sym)),
        };
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(Value::Float(match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div if y == 0.0 => return Err(mismatch(sym, "division by zero")),
            BinaryOp::Div => x / y,
            _ => x % y,
        })),
        _ => Err(mismatch(
            sym,
            &format!("cannot apply to {} and {}", a.type_name(), b.type_name()),
        )),
    }
}

fn apply_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, ExpressionError> {
    match op {
        BinaryOp::Equal => Ok(Value::Bool(values_equal(&l, &r))),
        BinaryOp::NotEqual => Ok(Value::Bool(!values_equal(&l, &r))),
        BinaryOp::LessThan => Ok(Value::Bool(compare(op, &l, &r)?.is_lt())),
        BinaryOp::LessThanOrEqual => Ok(Value::Bool(compare(op, &l, &r)?.is_le())),
        BinaryOp::GreaterThan => Ok(Value::Bool(compare(op, &l, &r)?.is_gt())),
        BinaryOp::GreaterThanOrEqual => Ok(Value::Bool(compare(op, &l, &r)?.is_ge())),
        BinaryOp::RegexMatch => match (&l, &r) {
            (Value::Str(s), Value::Str(pattern)) => regex::Regex::new(pattern)
                .map(|re| Value::Bool(re.is_match(s)))
                .map_err(|e| ExpressionError::InvalidRegex {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }),
            _ => Err(mismatch(
                "=~",
                &format!("needs strings, got {} and {}", l.type_name(), r.type_name()),
            )),
        },
        BinaryOp::In => match &r {
            Value::List(items) => Ok(Value::Bool(items.iter().any(|i| values_equal(&l, i)))),
            Value::Map(m) => match &l {
                Value::Str(k) => Ok(Value::Bool(m.contains_key(k))),
                other => Err(mismatch(
                    "in",
                    &format!("map keys are strings, got {}", other.type_name()),
                )),
            },
            other => Err(mismatch(
                "in",
                &format!("right side must be a list or map, got {}", other.type_name()),
            )),
        },
        BinaryOp::Add if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
            Ok(Value::Str(format!("{l}{r}")))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, l, r)
        }
    }
}
