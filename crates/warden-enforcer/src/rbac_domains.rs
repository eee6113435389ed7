// SPDX-License-Identifier: MIT OR Apache-2.0
//! Domain-scoped RBAC helpers for models with `g = _, _, _`.

use crate::Enforcer;
use std::collections::BTreeSet;
use warden_error::Result;

impl Enforcer {
    /// Direct members of `name` in `domain`.
    pub fn get_users_for_role_in_domain(&self, name: &str, domain: &str) -> Result<Vec<String>> {
        self.get_users_for_role(name, Some(domain))
    }

    /// Direct roles of `name` in `domain`.
    pub fn get_roles_for_user_in_domain(&self, name: &str, domain: &str) -> Result<Vec<String>> {
        self.get_roles_for_user(name, Some(domain))
    }

    /// Policy rules of `user` and of its direct roles in `domain`.
    pub fn get_permissions_for_user_in_domain(&self, user: &str, domain: &str) -> Result<Vec<Vec<String>>> {
        let mut out = self.get_filtered_policy(0, &[user, domain]);
        for role in self.get_roles_for_user_in_domain(user, domain)? {
            out.extend(self.get_filtered_policy(0, &[role.as_str(), domain]));
        }
        Ok(out)
    }

    /// Give `user` the role `role` in `domain`.
    pub fn add_role_for_user_in_domain(&mut self, user: &str, role: &str, domain: &str) -> Result<bool> {
        self.add_grouping_policy([user, role, domain])
    }

    /// Take `role` in `domain` away from `user`.
    pub fn delete_role_for_user_in_domain(&mut self, user: &str, role: &str, domain: &str) -> Result<bool> {
        self.remove_grouping_policy([user, role, domain])
    }

    /// Take every role in `domain` away from `user`.
    pub fn delete_roles_for_user_in_domain(&mut self, user: &str, domain: &str) -> Result<bool> {
        let rules: Vec<Vec<String>> = self
            .get_roles_for_user_in_domain(user, domain)?
            .into_iter()
            .map(|role| vec![user.to_string(), role, domain.to_string()])
            .collect();
        self.remove_grouping_policies(&rules)
    }

    /// Subjects of `domain`: members of its role links and subjects of its
    /// policy rules, first occurrence order.
    pub fn get_all_users_by_domain(&self, domain: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let dom = self.domain_index();
        let grouping = self.get_grouping_policy();
        let policy = self.get_policy();
        grouping
            .iter()
            .filter(|r| r.get(2).is_some_and(|d| d == domain))
            .chain(policy.iter().filter(|r| r.get(dom).is_some_and(|d| d == domain)))
            .filter_map(|r| r.first())
            .filter(|u| seen.insert(u.as_str()))
            .cloned()
            .collect()
    }

    /// Remove every grouping and policy rule of `domain`.
    pub fn delete_all_users_by_domain(&mut self, domain: &str) -> Result<bool> {
        let dom = self.domain_index();
        let grouping: Vec<Vec<String>> = self
            .get_grouping_policy()
            .into_iter()
            .filter(|r| r.get(2).is_some_and(|d| d == domain))
            .collect();
        let policy: Vec<Vec<String>> = self
            .get_policy()
            .into_iter()
            .filter(|r| r.get(dom).is_some_and(|d| d == domain))
            .collect();
        let removed_grouping = self.remove_grouping_policies(&grouping)?;
        let removed_policy = self.remove_policies(&policy)?;
        Ok(removed_grouping || removed_policy)
    }

    /// Remove every rule of each of `domains`. With no domains the whole
    /// policy is cleared.
    pub fn delete_domains(&mut self, domains: &[&str]) -> Result<bool> {
        if domains.is_empty() {
            self.clear_policy();
            return Ok(true);
        }
        let mut changed = false;
        for domain in domains {
            changed |= self.delete_all_users_by_domain(domain)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::to_rule;
    use warden_model::Model;

    const DOMAINS: &str = "\
[request_definition]
r = sub, dom, obj, act
[policy_definition]
p = sub, dom, obj, act
[role_definition]
g = _, _, _
[policy_effect]
e = some(where (p.eft == allow))
[matchers]
m = g(r.sub, p.sub, r.dom) && r.dom == p.dom && r.obj == p.obj && r.act == p.act
";

    fn enforcer() -> Enforcer {
        let mut e = Enforcer::new(Model::from_text(DOMAINS).unwrap()).unwrap();
        e.add_policies(&[
            to_rule(["admin", "domain1", "data1", "read"]),
            to_rule(["admin", "domain1", "data1", "write"]),
            to_rule(["admin", "domain2", "data2", "read"]),
            to_rule(["admin", "domain2", "data2", "write"]),
        ])
        .unwrap();
        e.add_role_for_user_in_domain("alice", "admin", "domain1").unwrap();
        e.add_role_for_user_in_domain("bob", "admin", "domain2").unwrap();
        e
    }

    #[test]
    fn roles_and_users_are_scoped() {
        let e = enforcer();
        assert_eq!(e.get_roles_for_user_in_domain("alice", "domain1").unwrap(), ["admin"]);
        assert!(e.get_roles_for_user_in_domain("alice", "domain2").unwrap().is_empty());
        assert_eq!(e.get_users_for_role_in_domain("admin", "domain2").unwrap(), ["bob"]);
        assert!(e.enforce(["alice", "domain1", "data1", "read"]).unwrap());
        assert!(!e.enforce(["alice", "domain2", "data2", "read"]).unwrap());
    }

    #[test]
    fn moving_a_role_between_users() {
        let mut e = enforcer();
        assert!(e.delete_role_for_user_in_domain("alice", "admin", "domain1").unwrap());
        assert!(e.add_role_for_user_in_domain("bob", "admin", "domain1").unwrap());
        assert_eq!(e.get_users_for_role_in_domain("admin", "domain1").unwrap(), ["bob"]);
        assert!(e.get_roles_for_user_in_domain("alice", "domain1").unwrap().is_empty());
        assert!(e.enforce(["bob", "domain1", "data1", "write"]).unwrap());
    }

    #[test]
    fn permissions_in_domain_include_role_rules() {
        let e = enforcer();
        assert_eq!(
            e.get_permissions_for_user_in_domain("alice", "domain1").unwrap(),
            vec![
                to_rule(["admin", "domain1", "data1", "read"]),
                to_rule(["admin", "domain1", "data1", "write"]),
            ]
        );
    }

    #[test]
    fn users_by_domain_and_domain_deletion() {
        let mut e = enforcer();
        assert_eq!(e.get_all_users_by_domain("domain1"), ["alice", "admin"]);
        assert!(e.delete_all_users_by_domain("domain1").unwrap());
        assert!(e.get_all_users_by_domain("domain1").is_empty());
        assert_eq!(e.get_policy().len(), 2);
        assert!(!e.enforce(["alice", "domain1", "data1", "read"]).unwrap());

        assert!(e.delete_domains(&[]).unwrap());
        assert!(e.get_policy().is_empty());
        assert!(e.get_grouping_policy().is_empty());
        assert!(!e.enforce(["bob", "domain2", "data2", "read"]).unwrap());
    }

    #[test]
    fn delete_roles_in_one_domain() {
        let mut e = enforcer();
        e.add_role_for_user_in_domain("alice", "auditor", "domain1").unwrap();
        e.add_role_for_user_in_domain("alice", "admin", "domain2").unwrap();
        assert!(e.delete_roles_for_user_in_domain("alice", "domain1").unwrap());
        assert!(e.get_roles_for_user_in_domain("alice", "domain1").unwrap().is_empty());
        assert_eq!(e.get_roles_for_user_in_domain("alice", "domain2").unwrap(), ["admin"]);
    }
}
