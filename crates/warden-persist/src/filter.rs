// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field filter for partial policy loads, keyed by policy type.
///
/// Position 0 of a field list is compared with the first field after the
/// policy type. An empty value matches anything. Policy types without an
/// entry are loaded in full.
///
/// ```
/// use warden_persist::Filter;
///
/// let filter = Filter::new().with("p", ["", "domain1"]);
/// let keep = |line: &[&str]| {
///     let rule: Vec<String> = line.iter().map(|s| s.to_string()).collect();
///     filter.keeps(&rule)
/// };
/// assert!(keep(&["p", "alice", "domain1", "data1"]));
/// assert!(!keep(&["p", "bob", "domain2", "data2"]));
/// assert!(keep(&["g", "alice", "admin"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    fields: BTreeMap<String, Vec<String>>,
}

impl Filter {
    /// Filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field list for `ptype`.
    pub fn with<I, S>(mut self, ptype: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .insert(ptype.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Field list for `ptype`.
    pub fn get(&self, ptype: &str) -> Option<&[String]> {
        self.fields.get(ptype).map(Vec::as_slice)
    }

    /// Whether a parsed line (`[ptype, field...]`) passes the filter.
    pub fn keeps(&self, line: &[String]) -> bool {
        let Some((ptype, fields)) = line.split_first() else {
            return false;
        };
        let Some(wanted) = self.fields.get(ptype) else {
            return true;
        };
        if fields.len() < wanted.len() {
            return false;
        }
        wanted
            .iter()
            .zip(fields)
            .all(|(want, have)| want.trim().is_empty() || want.trim() == have.trim())
    }
}
