// SPDX-License-Identifier: MIT OR Apache-2.0
//! Role-based access control helpers over the `g` and `p` tables.
//!
//! `domain` arguments select a domain-scoped role graph; `None` queries
//! the global one.

use crate::Enforcer;
use crate::management::to_rule;
use std::collections::{BTreeSet, VecDeque};
use warden_error::{RbacError, Result};

fn domains(domain: Option<&str>) -> Vec<&str> {
    domain.into_iter().collect()
}

impl Enforcer {
    fn default_rm(&self) -> Result<&dyn warden_rbac::RoleManager> {
        self.named_role_manager("g").ok_or_else(|| {
            RbacError::NotFound {
                ptype: "g".to_string(),
            }
            .into()
        })
    }

    /// Field position of the domain in `p` rules, `1` when the policy
    /// definition has no `dom` field.
    pub(crate) fn domain_index(&self) -> usize {
        self.model.field_index("p", "dom").unwrap_or(1)
    }

    /// Direct roles of `name`.
    pub fn get_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        Ok(self.default_rm()?.get_roles(name, &domains(domain))?)
    }

    /// Direct members of role `name`.
    pub fn get_users_for_role(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        Ok(self.default_rm()?.get_users(name, &domains(domain))?)
    }

    /// Whether `name` has `role` directly.
    pub fn has_role_for_user(&self, name: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        Ok(self
            .get_roles_for_user(name, domain)?
            .iter()
            .any(|r| r == role))
    }

    /// Give `user` the role `role`. `Ok(false)` when it already had it.
    pub fn add_role_for_user(&mut self, user: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        let mut rule = vec![user, role];
        rule.extend(domain);
        self.add_grouping_policy(rule)
    }

    /// Give `user` every role in `roles`, all or nothing.
    pub fn add_roles_for_user(&mut self, user: &str, roles: &[&str], domain: Option<&str>) -> Result<bool> {
        let rules: Vec<Vec<String>> = roles
            .iter()
            .map(|role| {
                let mut rule = vec![user, *role];
                rule.extend(domain);
                to_rule(rule)
            })
            .collect();
        self.add_grouping_policies(&rules)
    }

    /// Take `role` away from `user`.
    pub fn delete_role_for_user(&mut self, user: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        let mut rule = vec![user, role];
        rule.extend(domain);
        self.remove_grouping_policy(rule)
    }

    /// Take every role away from `user`.
    pub fn delete_roles_for_user(&mut self, user: &str, domain: Option<&str>) -> Result<bool> {
        match domain {
            Some(d) => self.remove_filtered_grouping_policy(0, &[user, "", d]),
            None => self.remove_filtered_grouping_policy(0, &[user]),
        }
    }

    /// Remove `user` from every grouping and policy rule where it is the
    /// subject.
    pub fn delete_user(&mut self, user: &str) -> Result<bool> {
        let grouping = self.remove_filtered_grouping_policy(0, &[user])?;
        let policy = self.remove_filtered_policy(0, &[user])?;
        Ok(grouping || policy)
    }

    /// Remove `role` from every grouping rule and every policy rule it is the
    /// subject of.
    pub fn delete_role(&mut self, role: &str) -> Result<bool> {
        let grouping = self.remove_filtered_grouping_policy(1, &[role])?;
        let policy = self.remove_filtered_policy(0, &[role])?;
        Ok(grouping || policy)
    }

    /// Remove every policy rule granting `permission` to anyone.
    pub fn delete_permission(&mut self, permission: &[&str]) -> Result<bool> {
        self.remove_filtered_policy(1, permission)
    }

    /// Grant `permission` to `user`.
    pub fn add_permission_for_user(&mut self, user: &str, permission: &[&str]) -> Result<bool> {
        self.add_policy(std::iter::once(user).chain(permission.iter().copied()))
    }

    /// Grant every permission in `permissions` to `user`, all or nothing.
    pub fn add_permissions_for_user(&mut self, user: &str, permissions: &[&[&str]]) -> Result<bool> {
        let rules: Vec<Vec<String>> = permissions
            .iter()
            .map(|p| to_rule(std::iter::once(user).chain(p.iter().copied())))
            .collect();
        self.add_policies(&rules)
    }

    /// Revoke `permission` from `user`.
    pub fn delete_permission_for_user(&mut self, user: &str, permission: &[&str]) -> Result<bool> {
        self.remove_policy(std::iter::once(user).chain(permission.iter().copied()))
    }

    /// Revoke every permission of `user`.
    pub fn delete_permissions_for_user(&mut self, user: &str) -> Result<bool> {
        self.remove_filtered_policy(0, &[user])
    }

    /// Policy rules naming `user` as subject, restricted to `domain` when
    /// given.
    pub fn get_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Vec<Vec<String>> {
        match domain {
            None => self.get_filtered_policy(0, &[user]),
            Some(d) => {
                let mut values = vec![""; self.domain_index() + 1];
                values[0] = user;
                values[self.domain_index()] = d;
                self.get_filtered_policy(0, &values)
            }
        }
    }

    /// Whether `user` holds `permission` directly.
    pub fn has_permission_for_user(&self, user: &str, permission: &[&str]) -> bool {
        let rule: Vec<&str> = std::iter::once(user).chain(permission.iter().copied()).collect();
        self.has_policy(rule.as_slice())
    }

    /// Every role `name` reaches through any grouping type, breadth first.
    pub fn get_implicit_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        let doms = domains(domain);
        let mut seen = BTreeSet::from([name.to_string()]);
        let mut queue = VecDeque::from([name.to_string()]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for rm in self.rms.values() {
                for role in rm.get_roles(&current, &doms)? {
                    if seen.insert(role.clone()) {
                        out.push(role.clone());
                        queue.push_back(role);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Permissions of `user` and of every role it reaches.
    pub fn get_implicit_permissions_for_user(
        &self,
        user: &str,
        domain: Option<&str>,
    ) -> Result<Vec<Vec<String>>> {
        let mut subjects = vec![user.to_string()];
        subjects.extend(self.get_implicit_roles_for_user(user, domain)?);
        Ok(subjects
            .iter()
            .flat_map(|s| self.get_permissions_for_user(s, domain))
            .collect())
    }

    /// Users (subjects that are not roles) granted `permission` by the
    /// enforcer, through any role.
    pub fn get_implicit_users_for_permission(&self, permission: &[&str]) -> Result<Vec<String>> {
        let mut subjects = self.get_all_subjects();
        subjects.extend(self.model.get_values_for_field_in_policy_all_types("g", 0));
        let roles: BTreeSet<String> = self
            .model
            .get_values_for_field_in_policy_all_types("g", 1)
            .into_iter()
            .collect();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for user in subjects {
            if roles.contains(&user) || !seen.insert(user.clone()) {
                continue;
            }
            let request = std::iter::once(user.as_str()).chain(permission.iter().copied());
            if self.enforce(request)? {
                out.push(user);
            }
        }
        Ok(out)
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

    /// `alice -> admin -> data2_admin`, `bob` with a direct permission.
    fn hierarchy() -> Enforcer {
        let mut e = Enforcer::new(Model::from_text(RBAC).unwrap()).unwrap();
        e.add_permission_for_user("alice", &["data1", "read"]).unwrap();
        e.add_permission_for_user("bob", &["data2", "write"]).unwrap();
        e.add_permissions_for_user("data2_admin", &[&["data2", "read"], &["data2", "write"]])
            .unwrap();
        e.add_role_for_user("alice", "admin", None).unwrap();
        e.add_role_for_user("admin", "data2_admin", None).unwrap();
        e
    }

    #[test]
    fn direct_roles_and_users() {
        let e = hierarchy();
        assert_eq!(e.get_roles_for_user("alice", None).unwrap(), ["admin"]);
        assert_eq!(e.get_users_for_role("data2_admin", None).unwrap(), ["admin"]);
        assert!(e.has_role_for_user("alice", "admin", None).unwrap());
        assert!(!e.has_role_for_user("alice", "data2_admin", None).unwrap());
        assert!(e.get_roles_for_user("nobody", None).unwrap().is_empty());
    }

    #[test]
    fn implicit_roles_and_permissions() {
        let e = hierarchy();
        assert_eq!(
            e.get_implicit_roles_for_user("alice", None).unwrap(),
            ["admin", "data2_admin"]
        );
        let perms = e.get_implicit_permissions_for_user("alice", None).unwrap();
        assert_eq!(
            perms,
            vec![
                to_rule(["alice", "data1", "read"]),
                to_rule(["data2_admin", "data2", "read"]),
                to_rule(["data2_admin", "data2", "write"]),
            ]
        );
    }

    #[test]
    fn implicit_users_skip_roles() {
        let e = hierarchy();
        assert_eq!(
            e.get_implicit_users_for_permission(&["data2", "write"]).unwrap(),
            ["alice", "bob"]
        );
    }

    #[test]
    fn deleting_users_roles_and_permissions() {
        let mut e = hierarchy();
        assert!(e.delete_permission_for_user("bob", &["data2", "write"]).unwrap());
        assert!(!e.has_permission_for_user("bob", &["data2", "write"]));

        assert!(e.delete_role("admin").unwrap());
        assert!(!e.enforce(["alice", "data2", "read"]).unwrap());
        assert!(e.get_roles_for_user("alice", None).unwrap().is_empty());

        assert!(e.delete_user("alice").unwrap());
        assert!(!e.delete_user("alice").unwrap());
        assert!(e.delete_permission(&["data2"]).unwrap());
        assert!(e.get_policy().is_empty());
    }

    #[test]
    fn add_roles_for_user_batches() {
        let mut e = hierarchy();
        assert!(e.add_roles_for_user("carol", &["r1", "r2"], None).unwrap());
        assert_eq!(e.get_roles_for_user("carol", None).unwrap(), ["r1", "r2"]);
        assert!(e.delete_roles_for_user("carol", None).unwrap());
        assert!(e.get_roles_for_user("carol", None).unwrap().is_empty());
    }
}
