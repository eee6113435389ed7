// SPDX-License-Identifier: MIT OR Apache-2.0

use warden_error::ExpressionError;
use warden_expr::{FunctionMap, Value, expect_args, str_arg};
use warden_match::MatchError;

fn expression_error(name: &str, err: MatchError) -> ExpressionError {
    match err {
        MatchError::InvalidRegex { pattern, message } => {
            ExpressionError::InvalidRegex { pattern, message }
        }
        other => ExpressionError::InvalidArgument {
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}

fn add_predicate(
    fm: &mut FunctionMap,
    name: &'static str,
    f: fn(&str, &str) -> Result<bool, MatchError>,
) {
    fm.add_fn(name, move |args: &[Value]| {
        expect_args(name, args, 2)?;
        let hit = f(str_arg(name, args, 0)?, str_arg(name, args, 1)?)
            .map_err(|e| expression_error(name, e))?;
        Ok(Value::Bool(hit))
    });
}

/// Function table every enforcer starts with.
///
/// | name | signature |
/// |---|---|
/// | `keyMatch` .. `keyMatch5` | `(key, pattern) -> bool` |
/// | `keyGet` | `(key, pattern) -> string` |
/// | `keyGet2` | `(key, pattern, name) -> string` |
/// | `regexMatch` | `(value, regex) -> bool` |
/// | `ipMatch` | `(ip, ip_or_cidr) -> bool` |
/// | `globMatch` | `(value, glob) -> bool` |
pub fn builtin_functions() -> FunctionMap {
    let mut fm = FunctionMap::new();

    add_predicate(&mut fm, "keyMatch", |a, b| Ok(warden_match::key_match(a, b)));
    add_predicate(&mut fm, "keyMatch2", warden_match::key_match2);
    add_predicate(&mut fm, "keyMatch3", warden_match::key_match3);
    add_predicate(&mut fm, "keyMatch4", warden_match::key_match4);
    add_predicate(&mut fm, "keyMatch5", warden_match::key_match5);
    add_predicate(&mut fm, "regexMatch", warden_match::regex_match);
    add_predicate(&mut fm, "ipMatch", warden_match::ip_match);
    add_predicate(&mut fm, "globMatch", warden_match::glob_match);

    fm.add_fn("keyGet", |args: &[Value]| {
        expect_args("keyGet", args, 2)?;
        Ok(Value::Str(warden_match::key_get(
            str_arg("keyGet", args, 0)?,
            str_arg("keyGet", args, 1)?,
        )))
    });
    fm.add_fn("keyGet2", |args: &[Value]| {
        expect_args("keyGet2", args, 3)?;
        warden_match::key_get2(
            str_arg("keyGet2", args, 0)?,
            str_arg("keyGet2", args, 1)?,
            str_arg("keyGet2", args, 2)?,
        )
        .map(Value::Str)
        .map_err(|e| expression_error("keyGet2", e))
    });

    fm
}
