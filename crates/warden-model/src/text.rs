// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rewrites applied to definition text.
//!
//! Matchers address request and policy fields as `r.sub` / `p.sub` in the
//! model file but as `r_sub` / `p_sub` inside the expression engine. Every
//! rewrite here leaves quoted string literals untouched.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static DOTTED_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:r|p)[0-9]*)\.").expect("static regex"));

static EVAL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\beval\(\s*([A-Za-z0-9_.]*)\s*\)").expect("static regex"));

/// Apply `f` to every span of `text` outside quoted literals.
fn map_unquoted(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '\'' && c != '"' {
            continue;
        }
        out.push_str(&f(&text[plain_start..i]));
        let mut end = text.len();
        let mut escaped = false;
        for (j, d) in chars.by_ref() {
            if escaped {
                escaped = false;
            } else if d == '\\' {
                escaped = true;
            } else if d == c {
                end = j + d.len_utf8();
                break;
            }
        }
        out.push_str(&text[i..end]);
        plain_start = end;
    }
    out.push_str(&f(&text[plain_start..]));
    out
}

/// `r.sub` -> `r_sub`, `p2.eft` -> `p2_eft`. Attribute paths past the first
/// dot are kept: `r.obj.owner` -> `r_obj.owner`.
pub fn escape_assertion(text: &str) -> String {
    map_unquoted(text, |span| DOTTED_FIELD.replace_all(span, "${1}_").into_owned())
}

/// Drop a trailing `#` comment.
pub fn remove_comments(text: &str) -> String {
    match text.find('#') {
        Some(pos) => text[..pos].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Replace whole identifiers found in `replacements`.
pub(crate) fn replace_identifiers(text: &str, replacements: &HashMap<String, String>) -> String {
    map_unquoted(text, |span| {
        let mut out = String::with_capacity(span.len());
        let mut ident = String::new();
        for c in span.chars() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                continue;
            }
            flush_ident(&mut out, &mut ident, replacements);
            out.push(c);
        }
        flush_ident(&mut out, &mut ident, replacements);
        out
    })
}

fn flush_ident(out: &mut String, ident: &mut String, replacements: &HashMap<String, String>) {
    if ident.is_empty() {
        return;
    }
    match replacements.get(ident.as_str()) {
        Some(new) => out.push_str(new),
        None => out.push_str(ident),
    }
    ident.clear();
}

/// Whether a matcher calls `eval(...)`.
pub fn has_eval(text: &str) -> bool {
    EVAL_CALL.is_match(text)
}

/// Arguments of every `eval(...)` call, in order of appearance.
pub fn eval_rule_names(text: &str) -> Vec<String> {
    EVAL_CALL
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Canonical key of a rule.
pub(crate) fn rule_key<S: AsRef<str>>(rule: &[S]) -> String {
    let mut key = String::new();
    for (i, field) in rule.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(field.as_ref());
    }
    key
}

/// Keep the first occurrence of each value.
pub(crate) fn dedup_preserving_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
