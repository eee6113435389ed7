// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::filter::Filter;
use warden_error::AdapterError;
use warden_model::{Model, load_policy_array, parse_policy_line, policy_to_line};

/// Parse policy text into `model`, skipping lines `filter` rejects.
pub fn load_policy_text(
    text: &str,
    model: &mut Model,
    filter: Option<&Filter>,
) -> Result<(), AdapterError> {
    for (i, line) in text.lines().enumerate() {
        let Some(rule) = parse_policy_line(line) else {
            continue;
        };
        if let Some(filter) = filter
            && !filter.keeps(&rule)
        {
            continue;
        }
        load_policy_array(&rule, model).map_err(|e| AdapterError::InvalidLine {
            line: i + 1,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Every `p` and `g` rule of `model` as policy text.
pub fn policy_text(model: &Model) -> String {
    PolicyRows::from_model(model).to_text()
}

fn field_matches(rule: &[String], field_index: usize, field_values: &[&str]) -> bool {
    field_values.iter().enumerate().all(|(i, want)| {
        want.is_empty() || rule.get(field_index + i).is_some_and(|have| have == want)
    })
}

/// Stored rules as `[ptype, field...]` rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PolicyRows {
    rows: Vec<Vec<String>>,
}

impl PolicyRows {
    pub(crate) fn parse(text: &str) -> Self {
        Self {
            rows: text.lines().filter_map(parse_policy_line).collect(),
        }
    }

    pub(crate) fn from_model(model: &Model) -> Self {
        let mut rows = Vec::new();
        for sec in ["p", "g"] {
            for (ptype, ast) in model.assertions(sec) {
                for rule in ast.policy() {
                    rows.push(row(ptype, rule));
                }
            }
        }
        Self { rows }
    }

    pub(crate) fn to_text(&self) -> String {
        let mut out = String::new();
        for r in &self.rows {
            if let Some((ptype, rule)) = r.split_first() {
                out.push_str(&policy_to_line(ptype, rule));
                out.push('\n');
            }
        }
        out
    }

    pub(crate) fn load_into(&self, model: &mut Model, filter: Option<&Filter>) -> Result<(), AdapterError> {
        for (i, r) in self.rows.iter().enumerate() {
            if filter.is_some_and(|f| !f.keeps(r)) {
                continue;
            }
            load_policy_array(r, model).map_err(|e| AdapterError::InvalidLine {
                line: i + 1,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub(crate) fn add(&mut self, ptype: &str, rule: &[String]) {
        let r = row(ptype, rule);
        if !self.rows.contains(&r) {
            self.rows.push(r);
        }
    }

    pub(crate) fn remove(&mut self, ptype: &str, rule: &[String]) {
        let r = row(ptype, rule);
        self.rows.retain(|x| *x != r);
    }

    pub(crate) fn remove_filtered(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Vec<Vec<String>> {
        let mut removed = Vec::new();
        if field_values.is_empty() {
            return removed;
        }
        self.rows.retain(|x| match x.split_first() {
            Some((p, rule)) if p == ptype && field_matches(rule, field_index, field_values) => {
                removed.push(rule.to_vec());
                false
            }
            _ => true,
        });
        removed
    }

    pub(crate) fn update(&mut self, ptype: &str, old: &[String], new: &[String]) {
        let old = row(ptype, old);
        for x in &mut self.rows {
            if *x == old {
                *x = row(ptype, new);
            }
        }
    }
}

fn row(ptype: &str, rule: &[String]) -> Vec<String> {
    let mut r = Vec::with_capacity(rule.len() + 1);
    r.push(ptype.to_string());
    r.extend_from_slice(rule);
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_round_trip_through_text() {
        let rows = PolicyRows::parse("p, alice, data1, read\n\n# note\ng, alice, admin\n");
        assert_eq!(rows.to_text(), "p, alice, data1, read\ng, alice, admin\n");
    }

    #[test]
    fn row_edits() {
        let mut rows = PolicyRows::default();
        rows.add("p", &rule(&["alice", "d1", "read"]));
        rows.add("p", &rule(&["alice", "d1", "read"]));
        rows.add("p", &rule(&["bob", "d2", "read"]));
        rows.add("g", &rule(&["alice", "admin"]));
        assert_eq!(rows.rows.len(), 3);

        rows.update("p", &rule(&["bob", "d2", "read"]), &rule(&["bob", "d2", "write"]));
        let removed = rows.remove_filtered("p", 1, &["d1"]);
        assert_eq!(removed, vec![rule(&["alice", "d1", "read"])]);
        rows.remove("g", &rule(&["alice", "admin"]));
        assert_eq!(rows.to_text(), "p, bob, d2, write\n");
    }
}
