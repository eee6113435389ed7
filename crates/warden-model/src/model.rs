// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::assertion::{Assertion, PolicyOp};
use crate::text::{escape_assertion, remove_comments, replace_identifiers};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use warden_config::Config;
use warden_error::{Error, ModelError, PolicyError, RbacError};
use warden_rbac::RoleManager;

/// Section keys and the INI section each one is read from.
pub const SECTIONS: [(&str, &str); 5] = [
    ("r", "request_definition"),
    ("p", "policy_definition"),
    ("g", "role_definition"),
    ("e", "policy_effect"),
    ("m", "matchers"),
];

/// Sections a model cannot work without.
pub const REQUIRED_SECTIONS: [&str; 4] = ["r", "p", "e", "m"];

/// INI section name of a section key.
pub fn section_name(sec: &str) -> Option<&'static str> {
    SECTIONS
        .iter()
        .find(|(key, _)| *key == sec)
        .map(|(_, name)| *name)
}

/// `p`, `p2`, `p3`, ...
fn numbered_key(sec: &str, i: usize) -> String {
    if i == 1 {
        sec.to_string()
    } else {
        format!("{sec}{i}")
    }
}

/// Role managers keyed by grouping policy type.
pub type RoleManagers = BTreeMap<String, Box<dyn RoleManager>>;

/// Parsed model: section key -> policy type -> assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    sections: BTreeMap<String, BTreeMap<String, Assertion>>,
}

impl Model {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse model definition text.
    pub fn from_text(text: &str) -> Result<Self, ModelError> {
        let cfg = Config::from_text(text)?;
        Self::from_config(&cfg)
    }

    /// Read and parse a model definition file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text)
    }

    /// Build a model from an already parsed definition.
    pub fn from_config(cfg: &Config) -> Result<Self, ModelError> {
        let mut model = Self::new();
        for (sec, name) in SECTIONS {
            let mut i = 1;
            loop {
                let key = numbered_key(sec, i);
                if !model.add_def(sec, &key, &cfg.string(&format!("{name}::{key}"))) {
                    break;
                }
                i += 1;
            }
        }

        let missing: Vec<String> = REQUIRED_SECTIONS
            .iter()
            .filter(|sec| !model.has_section(sec))
            .filter_map(|sec| section_name(sec).map(str::to_string))
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::MissingSections { sections: missing });
        }

        if let Some(bad) = model
            .assertions("g")
            .find(|(_, ast)| ast.role_arity() < 2)
            .map(|(_, ast)| ast)
        {
            return Err(ModelError::InvalidRoleDefinition {
                key: bad.key.clone(),
                value: bad.value.clone(),
            });
        }

        tracing::debug!(target: "warden.model", "model loaded");
        Ok(model)
    }

    /// Add one definition. Returns `false` and stores nothing when `value` is
    /// empty.
    pub fn add_def(&mut self, sec: &str, key: &str, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }

        let assertion = if sec == "r" || sec == "p" {
            let tokens = value
                .split(',')
                .map(|field| format!("{key}_{}", field.trim()))
                .collect();
            Assertion::new(key, value.to_string(), tokens)
        } else {
            Assertion::new(key, remove_comments(&escape_assertion(value)), Vec::new())
        };

        self.sections
            .entry(sec.to_string())
            .or_default()
            .insert(key.to_string(), assertion);
        true
    }

    /// Whether `sec` holds at least one definition.
    pub fn has_section(&self, sec: &str) -> bool {
        self.sections.get(sec).is_some_and(|s| !s.is_empty())
    }

    /// Assertion `ptype` of section `sec`.
    pub fn get(&self, sec: &str, ptype: &str) -> Option<&Assertion> {
        self.sections.get(sec)?.get(ptype)
    }

    /// Mutable assertion `ptype` of section `sec`.
    pub fn get_mut(&mut self, sec: &str, ptype: &str) -> Option<&mut Assertion> {
        self.sections.get_mut(sec)?.get_mut(ptype)
    }

    /// Every assertion in `sec`, ordered by policy type.
    pub fn assertions<'a>(
        &'a self,
        sec: &str,
    ) -> impl Iterator<Item = (&'a str, &'a Assertion)> + use<'a> {
        self.sections
            .get(sec)
            .into_iter()
            .flat_map(|s| s.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Every `(section, assertion)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Assertion)> {
        self.sections
            .iter()
            .flat_map(|(sec, s)| s.values().map(move |a| (sec.as_str(), a)))
    }

    fn assertion(&self, sec: &str, ptype: &str) -> Result<&Assertion, PolicyError> {
        self.get(sec, ptype).ok_or_else(|| PolicyError::UnknownType {
            sec: sec.to_string(),
            ptype: ptype.to_string(),
        })
    }

    fn assertion_mut(&mut self, sec: &str, ptype: &str) -> Result<&mut Assertion, PolicyError> {
        self.get_mut(sec, ptype).ok_or_else(|| PolicyError::UnknownType {
            sec: sec.to_string(),
            ptype: ptype.to_string(),
        })
    }

    /// Position of the field named `field` (without prefix) in `ptype`.
    pub fn field_index(&self, ptype: &str, field: &str) -> Option<usize> {
        let wanted = format!("{ptype}_{field}");
        self.get("p", ptype)?.tokens.iter().position(|t| *t == wanted)
    }

    /// Serialise back to definition text. `r_x` / `p_x` tokens are written in
    /// dotted form again.
    pub fn to_text(&self) -> String {
        let mut dotted = HashMap::new();
        for sec in ["r", "p"] {
            for (key, ast) in self.assertions(sec) {
                for token in &ast.tokens {
                    if let Some(field) = token.strip_prefix(&format!("{key}_")) {
                        dotted.insert(token.clone(), format!("{key}.{field}"));
                    }
                }
                if sec == "p" {
                    dotted.insert(format!("{key}_eft"), format!("{key}.eft"));
                }
            }
        }

        let mut out = String::new();
        let write_section = |out: &mut String, sec: &str, rewrite: bool| {
            let Some(name) = section_name(sec) else {
                return;
            };
            if !self.has_section(sec) {
                return;
            }
            let _ = writeln!(out, "[{name}]");
            for (key, ast) in self.assertions(sec) {
                let value = if rewrite {
                    replace_identifiers(&ast.value, &dotted)
                } else {
                    ast.value.clone()
                };
                let _ = writeln!(out, "{key} = {value}");
            }
        };
        write_section(&mut out, "r", true);
        write_section(&mut out, "p", true);
        write_section(&mut out, "g", false);
        write_section(&mut out, "e", true);
        write_section(&mut out, "m", true);
        out
    }

    // -- policy table ------------------------------------------------------

    /// Rules of `ptype`.
    pub fn get_policy(&self, sec: &str, ptype: &str) -> Vec<Vec<String>> {
        self.get(sec, ptype)
            .map(|a| a.policy().to_vec())
            .unwrap_or_default()
    }

    /// Rules of `ptype` whose fields from `field_index` match `field_values`.
    pub fn get_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Vec<Vec<String>> {
        self.get(sec, ptype)
            .map(|a| a.filtered_policy(field_index, field_values))
            .unwrap_or_default()
    }

    /// Whether `rule` is stored under `ptype`.
    pub fn has_policy<S: AsRef<str>>(&self, sec: &str, ptype: &str, rule: &[S]) -> bool {
        self.get(sec, ptype).is_some_and(|a| a.has_policy(rule))
    }

    /// Whether any of `rules` is stored under `ptype`.
    pub fn has_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> bool {
        self.get(sec, ptype)
            .is_some_and(|a| rules.iter().any(|r| a.has_policy(r)))
    }

    /// Append `rule`. `Ok(false)` for a duplicate.
    pub fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>) -> Result<bool, PolicyError> {
        Ok(self.assertion_mut(sec, ptype)?.add_policy(rule))
    }

    /// Append every rule not yet stored and return the ones that were added.
    pub fn add_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<Vec<Vec<String>>, PolicyError> {
        let ast = self.assertion_mut(sec, ptype)?;
        Ok(rules
            .iter()
            .filter(|r| ast.add_policy((*r).clone()))
            .cloned()
            .collect())
    }

    /// Remove `rule`. `Ok(false)` when absent.
    pub fn remove_policy<S: AsRef<str>>(
        &mut self,
        sec: &str,
        ptype: &str,
        rule: &[S],
    ) -> Result<bool, PolicyError> {
        Ok(self.assertion_mut(sec, ptype)?.remove_policy(rule))
    }

    /// Remove all of `rules`, or nothing when any of them is absent.
    pub fn remove_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<bool, PolicyError> {
        let ast = self.assertion_mut(sec, ptype)?;
        if rules.is_empty() || !rules.iter().all(|r| ast.has_policy(r)) {
            return Ok(false);
        }
        for rule in rules {
            ast.remove_policy(rule);
        }
        Ok(true)
    }

    /// Remove and return the rules matching the field filter.
    pub fn remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<Vec<Vec<String>>, PolicyError> {
        Ok(self
            .assertion_mut(sec, ptype)?
            .remove_filtered_policy(field_index, field_values))
    }

    /// Replace `old` with `new`, keeping its position.
    pub fn update_policy<S: AsRef<str>>(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[S],
        new: Vec<String>,
    ) -> Result<bool, PolicyError> {
        Ok(self.assertion_mut(sec, ptype)?.update_policy(old, new))
    }

    /// Pairwise replace `old[i]` with `new[i]`. Either every pair applies or
    /// the table is left unchanged.
    pub fn update_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<bool, PolicyError> {
        let ast = self.assertion_mut(sec, ptype)?;
        if old.len() != new.len() {
            return Ok(false);
        }
        let snapshot = ast.clone();
        for (o, n) in old.iter().zip(new) {
            if !ast.update_policy(o, n.clone()) {
                *ast = snapshot;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Remove the rules matching the field filter and append `new`. Returns
    /// the removed rules; nothing changes when none matched.
    pub fn update_filtered_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<Vec<Vec<String>>, PolicyError> {
        let ast = self.assertion_mut(sec, ptype)?;
        let removed = ast.remove_filtered_policy(field_index, field_values);
        if removed.is_empty() {
            return Ok(removed);
        }
        for rule in new {
            ast.add_policy(rule.clone());
        }
        Ok(removed)
    }

    /// Distinct values of one field of `ptype`.
    pub fn get_values_for_field_in_policy(&self, sec: &str, ptype: &str, field_index: usize) -> Vec<String> {
        self.get(sec, ptype)
            .map(|a| a.values_for_field(field_index))
            .unwrap_or_default()
    }

    /// Distinct values of one field across every policy type of `sec`.
    pub fn get_values_for_field_in_policy_all_types(&self, sec: &str, field_index: usize) -> Vec<String> {
        crate::text::dedup_preserving_order(
            self.assertions(sec)
                .flat_map(|(_, a)| a.values_for_field(field_index)),
        )
    }

    /// Drop every `p` and `g` rule.
    pub fn clear_policy(&mut self) {
        for sec in ["p", "g"] {
            if let Some(s) = self.sections.get_mut(sec) {
                s.values_mut().for_each(Assertion::clear_policy);
            }
        }
    }

    /// Rows of `ptype` that do not have as many fields as its definition.
    pub fn check_policy_size(&self, ptype: &str) -> Result<(), PolicyError> {
        let ast = self.assertion("p", ptype)?;
        let expected = ast.tokens.len();
        match ast.policy().iter().find(|r| r.len() != expected) {
            Some(row) => Err(PolicyError::Size {
                ptype: ptype.to_string(),
                expected,
                got: row.len(),
            }),
            None => Ok(()),
        }
    }

    // -- role links --------------------------------------------------------

    /// Rebuild every role manager from its `g` rules. Managers are cleared
    /// first.
    pub fn build_role_links(&self, rms: &mut RoleManagers) -> Result<(), Error> {
        for (ptype, ast) in self.assertions("g") {
            let rm = rms
                .get_mut(ptype)
                .ok_or_else(|| RbacError::NotFound { ptype: ptype.to_string() })?;
            rm.clear();
            ast.build_role_links(rm.as_mut())?;
        }
        Ok(())
    }

    /// Apply `rules` of grouping type `ptype` to its role manager.
    pub fn build_incremental_role_links(
        &self,
        rms: &mut RoleManagers,
        op: PolicyOp,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), Error> {
        let ast = self.assertion("g", ptype)?;
        let rm = rms
            .get_mut(ptype)
            .ok_or_else(|| RbacError::NotFound { ptype: ptype.to_string() })?;
        ast.build_incremental_role_links(rm.as_mut(), op, rules)
    }
}
