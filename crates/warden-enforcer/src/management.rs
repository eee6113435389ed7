// SPDX-License-Identifier: MIT OR Apache-2.0
//! Policy and grouping-policy management.
//!
//! Every mutating call follows the same order: capability check, in-memory
//! change, incremental role-link patch for grouping rules, adapter call,
//! watcher notification. An adapter failure is returned while the in-memory
//! change stands.

use crate::Enforcer;
use warden_error::Result;
use warden_model::PolicyOp;

/// Owned rule from any list of string-like fields.
pub(crate) fn to_rule<I, S>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

// ---------------------------------------------------------------------------
// internal mutation paths
// ---------------------------------------------------------------------------

impl Enforcer {
    fn patch_links(&mut self, sec: &str, ptype: &str, op: PolicyOp, rules: &[Vec<String>]) -> Result<()> {
        if sec == "g" && self.auto_build_role_links && !rules.is_empty() {
            self.model
                .build_incremental_role_links(&mut self.rms, op, ptype, rules)?;
        }
        Ok(())
    }

    pub(crate) fn add_policy_internal(&mut self, sec: &str, ptype: &str, rule: Vec<String>) -> Result<bool> {
        if self.model.has_policy(sec, ptype, &rule) {
            return Ok(false);
        }
        self.require_batch()?;
        if !self.model.add_policy(sec, ptype, rule.clone())? {
            return Ok(false);
        }
        let rules = [rule];
        self.patch_links(sec, ptype, PolicyOp::Add, &rules)?;
        self.persist_batch(|a| a.add_policy(sec, ptype, &rules[0]))?;
        self.notify(|w| w.update_for_add_policy(sec, ptype, &rules[0]))?;
        Ok(true)
    }

    /// Adds nothing when any of `rules` already exists.
    pub(crate) fn add_policies_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<bool> {
        if rules.is_empty() || self.model.has_policies(sec, ptype, rules) {
            return Ok(false);
        }
        self.require_batch()?;
        let added = self.model.add_policies(sec, ptype, rules)?;
        if added.is_empty() {
            return Ok(false);
        }
        self.patch_links(sec, ptype, PolicyOp::Add, &added)?;
        self.persist_batch(|a| a.add_policies(sec, ptype, &added))?;
        self.notify(|w| w.update_for_add_policies(sec, ptype, &added))?;
        Ok(true)
    }

    pub(crate) fn remove_policy_internal(&mut self, sec: &str, ptype: &str, rule: Vec<String>) -> Result<bool> {
        if !self.model.has_policy(sec, ptype, &rule) {
            return Ok(false);
        }
        self.require_batch()?;
        if !self.model.remove_policy(sec, ptype, &rule)? {
            return Ok(false);
        }
        let rules = [rule];
        self.patch_links(sec, ptype, PolicyOp::Remove, &rules)?;
        self.persist_batch(|a| a.remove_policy(sec, ptype, &rules[0]))?;
        self.notify(|w| w.update_for_remove_policy(sec, ptype, &rules[0]))?;
        Ok(true)
    }

    /// Removes nothing when any of `rules` is missing.
    pub(crate) fn remove_policies_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<bool> {
        if rules.is_empty() || !rules.iter().all(|r| self.model.has_policy(sec, ptype, r)) {
            return Ok(false);
        }
        self.require_batch()?;
        if !self.model.remove_policies(sec, ptype, rules)? {
            return Ok(false);
        }
        self.patch_links(sec, ptype, PolicyOp::Remove, rules)?;
        self.persist_batch(|a| a.remove_policies(sec, ptype, rules))?;
        self.notify(|w| w.update_for_remove_policies(sec, ptype, rules))?;
        Ok(true)
    }

    pub(crate) fn remove_filtered_policy_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<bool> {
        if self
            .model
            .get_filtered_policy(sec, ptype, field_index, field_values)
            .is_empty()
        {
            return Ok(false);
        }
        self.require_batch()?;
        let removed = self
            .model
            .remove_filtered_policy(sec, ptype, field_index, field_values)?;
        if removed.is_empty() {
            return Ok(false);
        }
        self.patch_links(sec, ptype, PolicyOp::Remove, &removed)?;
        self.persist_batch(|a| a.remove_filtered_policy(sec, ptype, field_index, field_values))?;
        self.notify(|w| w.update_for_remove_filtered_policy(sec, ptype, field_index, field_values))?;
        Ok(true)
    }

    pub(crate) fn update_policy_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        old: Vec<String>,
        new: Vec<String>,
    ) -> Result<bool> {
        if !self.model.has_policy(sec, ptype, &old) {
            return Ok(false);
        }
        self.require_updatable()?;
        if !self.model.update_policy(sec, ptype, &old, new.clone())? {
            return Ok(false);
        }
        let (old, new) = ([old], [new]);
        self.patch_links(sec, ptype, PolicyOp::Remove, &old)?;
        self.patch_links(sec, ptype, PolicyOp::Add, &new)?;
        self.persist_update(|a| a.update_policy(sec, ptype, &old[0], &new[0]))?;
        self.notify(|w| w.update_for_update_policy(sec, ptype, &old[0], &new[0]))?;
        Ok(true)
    }

    pub(crate) fn update_policies_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<bool> {
        if old.is_empty() || old.len() != new.len() {
            return Ok(false);
        }
        self.require_updatable()?;
        if !self.model.update_policies(sec, ptype, old, new)? {
            return Ok(false);
        }
        self.patch_links(sec, ptype, PolicyOp::Remove, old)?;
        self.patch_links(sec, ptype, PolicyOp::Add, new)?;
        self.persist_update(|a| a.update_policies(sec, ptype, old, new))?;
        self.notify(|w| w.update_for_update_policies(sec, ptype, old, new))?;
        Ok(true)
    }

    pub(crate) fn update_filtered_policies_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<bool> {
        if self
            .model
            .get_filtered_policy(sec, ptype, field_index, field_values)
            .is_empty()
        {
            return Ok(false);
        }
        self.require_updatable()?;
        let old = self
            .model
            .update_filtered_policies(sec, ptype, new, field_index, field_values)?;
        if old.is_empty() {
            return Ok(false);
        }
        self.patch_links(sec, ptype, PolicyOp::Remove, &old)?;
        self.patch_links(sec, ptype, PolicyOp::Add, new)?;
        self.persist_update(|a| {
            a.update_filtered_policies(sec, ptype, new, field_index, field_values)
                .map(drop)
        })?;
        self.notify(|w| w.update_for_update_policies(sec, ptype, &old, new))?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// public API
// ---------------------------------------------------------------------------

impl Enforcer {
    // -- listing -------------------------------------------------------------

    /// Subjects named in `p` rules.
    pub fn get_all_subjects(&self) -> Vec<String> {
        self.get_all_named_subjects("p")
    }

    /// Subjects named in `ptype` rules.
    pub fn get_all_named_subjects(&self, ptype: &str) -> Vec<String> {
        let i = self.model.field_index(ptype, "sub").unwrap_or(0);
        self.model.get_values_for_field_in_policy("p", ptype, i)
    }

    /// Objects named in `p` rules.
    pub fn get_all_objects(&self) -> Vec<String> {
        self.get_all_named_objects("p")
    }

    /// Objects named in `ptype` rules.
    pub fn get_all_named_objects(&self, ptype: &str) -> Vec<String> {
        let i = self.model.field_index(ptype, "obj").unwrap_or(1);
        self.model.get_values_for_field_in_policy("p", ptype, i)
    }

    /// Actions named in `p` rules.
    pub fn get_all_actions(&self) -> Vec<String> {
        self.get_all_named_actions("p")
    }

    /// Actions named in `ptype` rules.
    pub fn get_all_named_actions(&self, ptype: &str) -> Vec<String> {
        let i = self.model.field_index(ptype, "act").unwrap_or(2);
        self.model.get_values_for_field_in_policy("p", ptype, i)
    }

    /// Roles named in `g` rules.
    pub fn get_all_roles(&self) -> Vec<String> {
        self.get_all_named_roles("g")
    }

    /// Roles named in `ptype` grouping rules.
    pub fn get_all_named_roles(&self, ptype: &str) -> Vec<String> {
        self.model.get_values_for_field_in_policy("g", ptype, 1)
    }

    // -- policy reads --------------------------------------------------------

    /// Every `p` rule.
    pub fn get_policy(&self) -> Vec<Vec<String>> {
        self.get_named_policy("p")
    }

    /// `p` rules whose fields from `field_index` match `field_values`; empty
    /// values match anything.
    pub fn get_filtered_policy(&self, field_index: usize, field_values: &[&str]) -> Vec<Vec<String>> {
        self.get_filtered_named_policy("p", field_index, field_values)
    }

    /// Every `ptype` rule.
    pub fn get_named_policy(&self, ptype: &str) -> Vec<Vec<String>> {
        self.model.get_policy("p", ptype)
    }

    /// Filtered `ptype` rules.
    pub fn get_filtered_named_policy(
        &self,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Vec<Vec<String>> {
        self.model
            .get_filtered_policy("p", ptype, field_index, field_values)
    }

    /// Every `g` rule.
    pub fn get_grouping_policy(&self) -> Vec<Vec<String>> {
        self.get_named_grouping_policy("g")
    }

    /// Filtered `g` rules.
    pub fn get_filtered_grouping_policy(&self, field_index: usize, field_values: &[&str]) -> Vec<Vec<String>> {
        self.get_filtered_named_grouping_policy("g", field_index, field_values)
    }

    /// Every `ptype` grouping rule.
    pub fn get_named_grouping_policy(&self, ptype: &str) -> Vec<Vec<String>> {
        self.model.get_policy("g", ptype)
    }

    /// Filtered `ptype` grouping rules.
    pub fn get_filtered_named_grouping_policy(
        &self,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Vec<Vec<String>> {
        self.model
            .get_filtered_policy("g", ptype, field_index, field_values)
    }

    /// Whether the `p` rule exists.
    pub fn has_policy<S: AsRef<str>>(&self, rule: &[S]) -> bool {
        self.has_named_policy("p", rule)
    }

    /// Whether the `ptype` rule exists.
    pub fn has_named_policy<S: AsRef<str>>(&self, ptype: &str, rule: &[S]) -> bool {
        self.model.has_policy("p", ptype, rule)
    }

    /// Whether the `g` rule exists.
    pub fn has_grouping_policy<S: AsRef<str>>(&self, rule: &[S]) -> bool {
        self.has_named_grouping_policy("g", rule)
    }

    /// Whether the `ptype` grouping rule exists.
    pub fn has_named_grouping_policy<S: AsRef<str>>(&self, ptype: &str, rule: &[S]) -> bool {
        self.model.has_policy("g", ptype, rule)
    }

    // -- policy writes -------------------------------------------------------

    /// Add a `p` rule. `Ok(false)` when it already exists.
    pub fn add_policy<I, S>(&mut self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_named_policy("p", rule)
    }

    /// Add a `ptype` rule.
    pub fn add_named_policy<I, S>(&mut self, ptype: &str, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_policy_internal("p", ptype, to_rule(rule))
    }

    /// Add `p` rules. Nothing is added when any of them already exists.
    pub fn add_policies(&mut self, rules: &[Vec<String>]) -> Result<bool> {
        self.add_named_policies("p", rules)
    }

    /// Add `ptype` rules, all or nothing.
    pub fn add_named_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<bool> {
        self.add_policies_internal("p", ptype, rules)
    }

    /// Remove a `p` rule. `Ok(false)` when it does not exist.
    pub fn remove_policy<I, S>(&mut self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_named_policy("p", rule)
    }

    /// Remove a `ptype` rule.
    pub fn remove_named_policy<I, S>(&mut self, ptype: &str, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_policy_internal("p", ptype, to_rule(rule))
    }

    /// Remove `p` rules. Nothing is removed when any of them is missing.
    pub fn remove_policies(&mut self, rules: &[Vec<String>]) -> Result<bool> {
        self.remove_named_policies("p", rules)
    }

    /// Remove `ptype` rules, all or nothing.
    pub fn remove_named_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<bool> {
        self.remove_policies_internal("p", ptype, rules)
    }

    /// Remove every `p` rule matching the field filter.
    pub fn remove_filtered_policy(&mut self, field_index: usize, field_values: &[&str]) -> Result<bool> {
        self.remove_filtered_named_policy("p", field_index, field_values)
    }

    /// Remove every `ptype` rule matching the field filter.
    pub fn remove_filtered_named_policy(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<bool> {
        self.remove_filtered_policy_internal("p", ptype, field_index, field_values)
    }

    /// Replace a `p` rule in place.
    pub fn update_policy(&mut self, old: &[&str], new: &[&str]) -> Result<bool> {
        self.update_named_policy("p", old, new)
    }

    /// Replace a `ptype` rule in place.
    pub fn update_named_policy(&mut self, ptype: &str, old: &[&str], new: &[&str]) -> Result<bool> {
        self.update_policy_internal("p", ptype, to_rule(old.iter().copied()), to_rule(new.iter().copied()))
    }

    /// Pairwise replace `p` rules, all or nothing.
    pub fn update_policies(&mut self, old: &[Vec<String>], new: &[Vec<String>]) -> Result<bool> {
        self.update_named_policies("p", old, new)
    }

    /// Pairwise replace `ptype` rules, all or nothing.
    pub fn update_named_policies(
        &mut self,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<bool> {
        self.update_policies_internal("p", ptype, old, new)
    }

    /// Replace the `p` rules matching the field filter with `new`.
    pub fn update_filtered_policies(
        &mut self,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<bool> {
        self.update_filtered_named_policies("p", new, field_index, field_values)
    }

    /// Replace the `ptype` rules matching the field filter with `new`.
    pub fn update_filtered_named_policies(
        &mut self,
        ptype: &str,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<bool> {
        self.update_filtered_policies_internal("p", ptype, new, field_index, field_values)
    }

    // -- grouping writes -----------------------------------------------------

    /// Add a `g` rule.
    pub fn add_grouping_policy<I, S>(&mut self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_named_grouping_policy("g", rule)
    }

    /// Add a `ptype` grouping rule.
    pub fn add_named_grouping_policy<I, S>(&mut self, ptype: &str, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_policy_internal("g", ptype, to_rule(rule))
    }

    /// Add `g` rules, all or nothing.
    pub fn add_grouping_policies(&mut self, rules: &[Vec<String>]) -> Result<bool> {
        self.add_named_grouping_policies("g", rules)
    }

    /// Add `ptype` grouping rules, all or nothing.
    pub fn add_named_grouping_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<bool> {
        self.add_policies_internal("g", ptype, rules)
    }

    /// Remove a `g` rule.
    pub fn remove_grouping_policy<I, S>(&mut self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_named_grouping_policy("g", rule)
    }

    /// Remove a `ptype` grouping rule.
    pub fn remove_named_grouping_policy<I, S>(&mut self, ptype: &str, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_policy_internal("g", ptype, to_rule(rule))
    }

    /// Remove `g` rules, all or nothing.
    pub fn remove_grouping_policies(&mut self, rules: &[Vec<String>]) -> Result<bool> {
        self.remove_named_grouping_policies("g", rules)
    }

    /// Remove `ptype` grouping rules, all or nothing.
    pub fn remove_named_grouping_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<bool> {
        self.remove_policies_internal("g", ptype, rules)
    }

    /// Remove every `g` rule matching the field filter.
    pub fn remove_filtered_grouping_policy(&mut self, field_index: usize, field_values: &[&str]) -> Result<bool> {
        self.remove_filtered_named_grouping_policy("g", field_index, field_values)
    }

    /// Remove every `ptype` grouping rule matching the field filter.
    pub fn remove_filtered_named_grouping_policy(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<bool> {
        self.remove_filtered_policy_internal("g", ptype, field_index, field_values)
    }

    /// Replace a `g` rule in place.
    pub fn update_grouping_policy(&mut self, old: &[&str], new: &[&str]) -> Result<bool> {
        self.update_named_grouping_policy("g", old, new)
    }

    /// Replace a `ptype` grouping rule in place.
    pub fn update_named_grouping_policy(&mut self, ptype: &str, old: &[&str], new: &[&str]) -> Result<bool> {
        self.update_policy_internal("g", ptype, to_rule(old.iter().copied()), to_rule(new.iter().copied()))
    }

    /// Pairwise replace `g` rules, all or nothing.
    pub fn update_grouping_policies(&mut self, old: &[Vec<String>], new: &[Vec<String>]) -> Result<bool> {
        self.update_named_grouping_policies("g", old, new)
    }

    /// Pairwise replace `ptype` grouping rules, all or nothing.
    pub fn update_named_grouping_policies(
        &mut self,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<bool> {
        self.update_policies_internal("g", ptype, old, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_model::Model;

    const RBAC: &str = "\
[request_definition]
r = sub, obj, act
[policy_definition]
p = sub, obj, act
[role_definition]
g = _, _
[policy_effect]
e = some(where (p.eft == allow))
[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
";

    fn rules(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter().map(|r| to_rule(r.iter().copied())).collect()
    }

    fn enforcer() -> Enforcer {
        let mut e = Enforcer::new(Model::from_text(RBAC).unwrap()).unwrap();
        e.add_policies(&rules(&[
            &["alice", "data1", "read"],
            &["bob", "data2", "write"],
            &["data2_admin", "data2", "read"],
            &["data2_admin", "data2", "write"],
        ]))
        .unwrap();
        e.add_grouping_policy(["alice", "data2_admin"]).unwrap();
        e
    }

    #[test]
    fn listing_helpers() {
        let e = enforcer();
        assert_eq!(e.get_all_subjects(), ["alice", "bob", "data2_admin"]);
        assert_eq!(e.get_all_objects(), ["data1", "data2"]);
        assert_eq!(e.get_all_actions(), ["read", "write"]);
        assert_eq!(e.get_all_roles(), ["data2_admin"]);
    }

    #[test]
    fn duplicate_add_is_a_no_op() {
        let mut e = enforcer();
        assert!(!e.add_policy(["alice", "data1", "read"]).unwrap());
        assert_eq!(e.get_policy().len(), 4);
    }

    #[test]
    fn batch_add_is_all_or_nothing() {
        let mut e = enforcer();
        let batch = rules(&[&["carol", "data3", "read"], &["alice", "data1", "read"]]);
        assert!(!e.add_policies(&batch).unwrap());
        assert!(!e.has_policy(&["carol", "data3", "read"]));
    }

    #[test]
    fn grouping_changes_patch_role_links() {
        let mut e = enforcer();
        assert!(e.enforce(["alice", "data2", "write"]).unwrap());
        assert!(e.remove_grouping_policy(["alice", "data2_admin"]).unwrap());
        assert!(!e.enforce(["alice", "data2", "write"]).unwrap());
        assert!(e.add_grouping_policy(["bob", "data2_admin"]).unwrap());
        assert!(e.enforce(["bob", "data2", "read"]).unwrap());
        assert!(e.update_grouping_policy(&["bob", "data2_admin"], &["carol", "data2_admin"]).unwrap());
        assert!(!e.enforce(["bob", "data2", "read"]).unwrap());
        assert!(e.enforce(["carol", "data2", "read"]).unwrap());
    }

    #[test]
    fn links_are_left_alone_without_auto_build() {
        let mut e = enforcer();
        e.enable_auto_build_role_links(false);
        e.add_grouping_policy(["bob", "data2_admin"]).unwrap();
        assert!(!e.enforce(["bob", "data2", "read"]).unwrap());
        e.build_role_links().unwrap();
        assert!(e.enforce(["bob", "data2", "read"]).unwrap());
    }

    #[test]
    fn filtered_remove_and_update() {
        let mut e = enforcer();
        assert!(e.remove_filtered_policy(0, &["data2_admin"]).unwrap());
        assert!(!e.remove_filtered_policy(0, &["data2_admin"]).unwrap());
        assert_eq!(e.get_policy().len(), 2);

        let new = rules(&[&["bob", "data2", "read"]]);
        assert!(e.update_filtered_policies(&new, 0, &["bob"]).unwrap());
        assert_eq!(e.get_filtered_policy(0, &["bob"]), new);
    }

    #[test]
    fn update_missing_rule_is_a_no_op() {
        let mut e = enforcer();
        assert!(!e.update_policy(&["nobody", "x", "y"], &["alice", "x", "y"]).unwrap());
        let old = rules(&[&["alice", "data1", "read"], &["nobody", "x", "y"]]);
        let new = rules(&[&["alice", "data1", "write"], &["somebody", "x", "y"]]);
        assert!(!e.update_policies(&old, &new).unwrap());
        assert!(e.has_policy(&["alice", "data1", "read"]));
    }

    #[test]
    fn unknown_policy_type_is_an_error() {
        let mut e = enforcer();
        assert!(e.add_named_policy("p9", ["a", "b", "c"]).is_err());
    }
}
