//! # Matcher expression language
//!
//! Matchers and `eval()` policy rules are written in a small expression
//! language, compiled once into an [`Expr`] tree and evaluated many times
//! against a [`Scope`].
//!
//! ## Syntax
//!
//! ```text
//! r_sub == p_sub && r_obj == p_obj
//! g(r_sub, p_sub) && keyMatch2(r_obj, p_obj)
//! r_sub.Age >= 18 && r_act in ('read', 'write')
//! r_obj =~ '^/api/' || !(r_sub == 'guest')
//! ```
//!
//! * literals: `'single'` / `"double"` quoted strings, integers, floats, `true`, `false`
//! * identifiers with dotted attribute paths into structured values
//! * operators, loosest first: `||`, `&&`, comparison (`== != < <= > >= =~ in`),
//!   `+ -`, `* / %`, unary `! -`
//! * calls `name(args...)`, tuples `(a, b)` and lists `[a, b]`
//!
//! ## Limits
//!
//! Source text is capped at [`MAX_EXPR_LENGTH`] bytes and syntactic nesting at
//! [`MAX_EXPR_DEPTH`]; evaluation recursion is capped at [`MAX_EVAL_DEPTH`].
//!
//! ```
//! use warden_expr::{Expr, FunctionMap, MapScope};
//!
//! let expr = Expr::parse("r_sub == p_sub && r_act in ('read', 'write')").unwrap();
//! let functions = FunctionMap::new();
//! let mut scope = MapScope::new(&functions);
//! scope.set("r_sub", "alice").set("p_sub", "alice").set("r_act", "read");
//! assert!(expr.matches(&scope).unwrap());
//! ```
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod eval;
mod function;
mod lexer;
mod parser;
mod value;

pub use eval::{MAX_EVAL_DEPTH, MapScope, Scope, values_equal};
pub use function::{Function, FunctionMap, expect_args, str_arg};
pub use parser::{BinaryOp, Expr, UnaryOp};
pub use value::Value;
pub use warden_error::ExpressionError;

/// Maximum syntactic nesting of parentheses, calls and unary operators.
pub const MAX_EXPR_DEPTH: usize = 64;

/// Maximum length of expression source text in bytes.
pub const MAX_EXPR_LENGTH: usize = 16 * 1024;
