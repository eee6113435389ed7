// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::model::Model;
use warden_error::PolicyError;

/// Split one line of policy text into fields.
///
/// Fields are comma separated and trimmed. A field wrapped in double quotes
/// may contain commas; `""` inside it stands for one quote. Returns `None` for
/// blank lines and `#` comments.
pub fn parse_policy_line(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    Some(fields)
}

/// Store one parsed rule (`[ptype, field...]`) in `model`. Duplicates are
/// skipped.
pub fn load_policy_array(rule: &[String], model: &mut Model) -> Result<(), PolicyError> {
    let Some((ptype, fields)) = rule.split_first() else {
        return Ok(());
    };
    let sec = ptype.get(..1).unwrap_or_default();
    model.add_policy(sec, ptype, fields.to_vec())?;
    Ok(())
}

/// Parse one line of policy text into `model`.
pub fn load_policy_line(line: &str, model: &mut Model) -> Result<(), PolicyError> {
    match parse_policy_line(line) {
        Some(rule) => load_policy_array(&rule, model),
        None => Ok(()),
    }
}

/// Render one rule as a policy line, quoting fields that need it.
pub fn policy_to_line<S: AsRef<str>>(ptype: &str, rule: &[S]) -> String {
    let mut line = ptype.to_string();
    for field in rule {
        let field = field.as_ref();
        line.push_str(", ");
        if field.contains(',') || field.contains('"') || field != field.trim() {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line
}
