// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::text::{dedup_preserving_order, rule_key};
use std::collections::HashMap;
use warden_error::{Error, ModelError, PolicyError};
use warden_rbac::RoleManager;

/// Direction of an incremental role-link update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOp {
    /// Rules were added.
    Add,
    /// Rules were removed.
    Remove,
}

/// One `key = value` definition plus the rules stored under it.
///
/// The rule table and its index are only reachable through methods, so they
/// never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    /// Policy type, e.g. `p`, `g2`.
    pub key: String,
    /// Definition text after escaping.
    pub value: String,
    /// Field names prefixed by the key (`p_sub`, `p_obj`). Only `r` and `p`
    /// assertions carry tokens.
    pub tokens: Vec<String>,
    policy: Vec<Vec<String>>,
    policy_map: HashMap<String, usize>,
}

fn field_matches(rule: &[String], field_index: usize, field_values: &[&str]) -> bool {
    field_values.iter().enumerate().all(|(i, want)| {
        want.is_empty()
            || rule
                .get(field_index + i)
                .is_some_and(|have| have == want)
    })
}

impl Assertion {
    pub(crate) fn new(key: &str, value: String, tokens: Vec<String>) -> Self {
        Self {
            key: key.to_string(),
            value,
            tokens,
            policy: Vec::new(),
            policy_map: HashMap::new(),
        }
    }

    /// Stored rules in insertion order.
    pub fn policy(&self) -> &[Vec<String>] {
        &self.policy
    }

    /// Position of `rule` in [`policy`](Self::policy).
    pub fn index_of<S: AsRef<str>>(&self, rule: &[S]) -> Option<usize> {
        self.policy_map.get(&rule_key(rule)).copied()
    }

    /// Whether `rule` is stored.
    pub fn has_policy<S: AsRef<str>>(&self, rule: &[S]) -> bool {
        self.policy_map.contains_key(&rule_key(rule))
    }

    /// Append `rule`. Returns `false` for a duplicate.
    pub fn add_policy(&mut self, rule: Vec<String>) -> bool {
        let key = rule_key(&rule);
        if self.policy_map.contains_key(&key) {
            return false;
        }
        self.policy_map.insert(key, self.policy.len());
        self.policy.push(rule);
        true
    }

    /// Remove `rule`. Returns `false` when it was not stored.
    pub fn remove_policy<S: AsRef<str>>(&mut self, rule: &[S]) -> bool {
        let Some(index) = self.policy_map.remove(&rule_key(rule)) else {
            return false;
        };
        self.policy.remove(index);
        for i in self.policy_map.values_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        true
    }

    /// Replace `old` with `new` in place. Returns `false` when `old` is
    /// missing or `new` is already stored elsewhere.
    pub fn update_policy<S: AsRef<str>>(&mut self, old: &[S], new: Vec<String>) -> bool {
        let old_key = rule_key(old);
        let new_key = rule_key(&new);
        let Some(&index) = self.policy_map.get(&old_key) else {
            return false;
        };
        if old_key != new_key && self.policy_map.contains_key(&new_key) {
            return false;
        }
        self.policy_map.remove(&old_key);
        self.policy_map.insert(new_key, index);
        self.policy[index] = new;
        true
    }

    /// Rules whose fields starting at `field_index` equal `field_values`. An
    /// empty value matches anything.
    pub fn filtered_policy(&self, field_index: usize, field_values: &[&str]) -> Vec<Vec<String>> {
        self.policy
            .iter()
            .filter(|rule| field_matches(rule, field_index, field_values))
            .cloned()
            .collect()
    }

    /// Remove the rules [`filtered_policy`](Self::filtered_policy) would
    /// return, and return them.
    pub fn remove_filtered_policy(
        &mut self,
        field_index: usize,
        field_values: &[&str],
    ) -> Vec<Vec<String>> {
        if field_values.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.policy)
            .into_iter()
            .partition(|rule| field_matches(rule, field_index, field_values));
        self.policy = kept;
        self.reindex();
        removed
    }

    /// Distinct values of one field, in order of first appearance.
    pub fn values_for_field(&self, field_index: usize) -> Vec<String> {
        dedup_preserving_order(
            self.policy
                .iter()
                .filter_map(|rule| rule.get(field_index).cloned()),
        )
    }

    /// Drop every rule.
    pub fn clear_policy(&mut self) {
        self.policy.clear();
        self.policy_map.clear();
    }

    fn reindex(&mut self) {
        self.policy_map = self
            .policy
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule_key(rule), i))
            .collect();
    }

    /// Number of `_` placeholders in a role definition.
    pub fn role_arity(&self) -> usize {
        self.value.matches('_').count()
    }

    fn checked_role_arity(&self) -> Result<usize, Error> {
        let count = self.role_arity();
        if count < 2 {
            return Err(ModelError::InvalidRoleDefinition {
                key: self.key.clone(),
                value: self.value.clone(),
            }
            .into());
        }
        Ok(count)
    }

    fn link_fields<'a>(&self, rule: &'a [String], arity: usize) -> Result<Vec<&'a str>, Error> {
        if rule.len() < arity {
            return Err(PolicyError::RoleArity {
                ptype: self.key.clone(),
                expected: arity,
                got: rule.len(),
            }
            .into());
        }
        Ok(rule[..arity].iter().map(String::as_str).collect())
    }

    /// Feed every stored rule into `rm`.
    pub fn build_role_links(&self, rm: &mut dyn RoleManager) -> Result<(), Error> {
        self.apply_links(rm, PolicyOp::Add, &self.policy)
    }

    /// Feed only `rules` into `rm`, as additions or removals.
    pub fn build_incremental_role_links(
        &self,
        rm: &mut dyn RoleManager,
        op: PolicyOp,
        rules: &[Vec<String>],
    ) -> Result<(), Error> {
        self.apply_links(rm, op, rules)
    }

    fn apply_links(
        &self,
        rm: &mut dyn RoleManager,
        op: PolicyOp,
        rules: &[Vec<String>],
    ) -> Result<(), Error> {
        let arity = self.checked_role_arity()?;
        for rule in rules {
            let fields = self.link_fields(rule, arity)?;
            match op {
                PolicyOp::Add => rm.add_link(fields[0], fields[1], &fields[2..])?,
                PolicyOp::Remove => rm.delete_link(fields[0], fields[1], &fields[2..])?,
            };
        }
        if op == PolicyOp::Add {
            for rule in rules {
                let fields = self.link_fields(rule, arity)?;
                rm.build_relationship(fields[0], fields[1], &fields[2..])?;
            }
        }
        tracing::debug!(
            target: "warden.model",
            ptype = %self.key,
            ?op,
            rules = rules.len(),
            "role links applied"
        );
        Ok(())
    }
}
