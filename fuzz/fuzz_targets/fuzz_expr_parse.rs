// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz the matcher expression parser and evaluator.
//!
//! Parsing is bounded in length and depth; evaluation of any parsed tree
//! against a small scope must return a value or an error, never panic.
#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use warden_expr::{Expr, FunctionMap, MapScope};

#[derive(Debug, Arbitrary)]
struct ExprInput {
    source: String,
    sub: String,
    obj: String,
    age: i64,
}

fuzz_target!(|input: ExprInput| {
    let Ok(expr) = Expr::parse(&input.source) else {
        return;
    };
    let _ = expr.variables();
    let _ = expr.functions();

    let functions = FunctionMap::new();
    let mut scope = MapScope::new(&functions);
    scope
        .set("r_sub", input.sub.as_str())
        .set("p_sub", input.obj.as_str())
        .set("r_obj", input.obj.as_str())
        .set("r_age", input.age);
    let _ = expr.eval(&scope);
});
