// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{MatchingFn, RoleManager};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use warden_error::RbacError;

/// Graph key for links without a domain.
const NO_DOMAIN: &str = "";

/// Default inheritance depth.
pub const DEFAULT_MAX_HIERARCHY_LEVEL: usize = 10;

/// One stored role link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    /// Member.
    pub user: String,
    /// Role.
    pub role: String,
    /// Domain, `None` for global links.
    pub domain: Option<String>,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.domain {
            Some(d) => write!(f, "{} < {} ({d})", self.user, self.role),
            None => write!(f, "{} < {}", self.user, self.role),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RoleGraph {
    /// user -> direct roles
    roles: BTreeMap<String, BTreeSet<String>>,
    /// role -> direct users
    users: BTreeMap<String, BTreeSet<String>>,
}

impl RoleGraph {
    fn insert(&mut self, user: &str, role: &str) -> bool {
        let added = self
            .roles
            .entry(user.to_string())
            .or_default()
            .insert(role.to_string());
        self.users
            .entry(role.to_string())
            .or_default()
            .insert(user.to_string());
        added
    }

    fn remove(&mut self, user: &str, role: &str) -> bool {
        let removed = match self.roles.get_mut(user) {
            Some(set) => {
                let removed = set.remove(role);
                if set.is_empty() {
                    self.roles.remove(user);
                }
                removed
            }
            None => false,
        };
        if let Some(set) = self.users.get_mut(role) {
            set.remove(user);
            if set.is_empty() {
                self.users.remove(role);
            }
        }
        removed
    }

    fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Role manager keeping one graph per domain.
///
/// With a matching function installed, stored names act as patterns: a
/// queried name `n` uses the links of every stored name `u` where
/// `u == n || f(n, u)`, and a reached role `r` satisfies the target `t` when
/// `r == t || f(r, t)`. A domain matching function does the same for domains,
/// merging the graphs of every matching stored domain.
#[derive(Clone)]
pub struct DefaultRoleManager {
    graphs: BTreeMap<String, RoleGraph>,
    max_hierarchy_level: usize,
    matching_fn: Option<(String, MatchingFn)>,
    domain_matching_fn: Option<(String, MatchingFn)>,
}

impl Default for DefaultRoleManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HIERARCHY_LEVEL)
    }
}

impl fmt::Debug for DefaultRoleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultRoleManager")
            .field("graphs", &self.graphs)
            .field("max_hierarchy_level", &self.max_hierarchy_level)
            .field("matching_fn", &self.matching_fn.as_ref().map(|(n, _)| n))
            .field(
                "domain_matching_fn",
                &self.domain_matching_fn.as_ref().map(|(n, _)| n),
            )
            .finish()
    }
}

fn domain_key<'a>(domains: &[&'a str]) -> Result<&'a str, RbacError> {
    match domains {
        [] => Ok(NO_DOMAIN),
        [d] => Ok(d),
        more => Err(RbacError::DomainArity { count: more.len() }),
    }
}

impl DefaultRoleManager {
    /// Role manager searching at most `max_hierarchy_level` links deep.
    pub fn new(max_hierarchy_level: usize) -> Self {
        Self {
            graphs: BTreeMap::new(),
            max_hierarchy_level,
            matching_fn: None,
            domain_matching_fn: None,
        }
    }

    /// Builder form of [`RoleManager::add_matching_fn`].
    pub fn with_matching_fn(mut self, name: &str, f: MatchingFn) -> Self {
        self.add_matching_fn(name, f);
        self
    }

    /// Builder form of [`RoleManager::add_domain_matching_fn`].
    pub fn with_domain_matching_fn(mut self, name: &str, f: MatchingFn) -> Self {
        self.add_domain_matching_fn(name, f);
        self
    }

    /// Configured inheritance depth.
    pub fn max_hierarchy_level(&self) -> usize {
        self.max_hierarchy_level
    }

    fn name_matches(&self, query: &str, stored: &str) -> bool {
        query == stored
            || self
                .matching_fn
                .as_ref()
                .is_some_and(|(_, f)| f(query, stored))
    }

    /// Graphs whose domain matches `domain`.
    fn graphs_for<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a RoleGraph> + 'a {
        self.graphs.iter().filter_map(move |(key, graph)| {
            let hit = key == domain
                || self
                    .domain_matching_fn
                    .as_ref()
                    .is_some_and(|(_, f)| f(domain, key));
            hit.then_some(graph)
        })
    }

    /// Direct roles of every stored user matching `name`.
    fn direct_roles(&self, name: &str, domain: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for graph in self.graphs_for(domain) {
            if self.matching_fn.is_none() {
                if let Some(roles) = graph.roles.get(name) {
                    out.extend(roles.iter().cloned());
                }
                continue;
            }
            for (user, roles) in &graph.roles {
                if self.name_matches(name, user) {
                    out.extend(roles.iter().cloned());
                }
            }
        }
        out
    }
}

impl RoleManager for DefaultRoleManager {
    fn clear(&mut self) {
        self.graphs.clear();
    }

    fn add_link(&mut self, name1: &str, name2: &str, domains: &[&str]) -> Result<bool, RbacError> {
        let domain = domain_key(domains)?;
        Ok(self
            .graphs
            .entry(domain.to_string())
            .or_default()
            .insert(name1, name2))
    }

    fn delete_link(
        &mut self,
        name1: &str,
        name2: &str,
        domains: &[&str],
    ) -> Result<bool, RbacError> {
        let domain = domain_key(domains)?;
        let Some(graph) = self.graphs.get_mut(domain) else {
            return Ok(false);
        };
        let removed = graph.remove(name1, name2);
        if graph.is_empty() {
            self.graphs.remove(domain);
        }
        Ok(removed)
    }

    fn has_link(&self, name1: &str, name2: &str, domains: &[&str]) -> Result<bool, RbacError> {
        let domain = domain_key(domains)?;
        if self.name_matches(name1, name2) {
            return Ok(true);
        }

        let mut visited: BTreeSet<String> = BTreeSet::new();
        visited.insert(name1.to_string());
        let mut frontier = vec![name1.to_string()];

        for _ in 0..self.max_hierarchy_level {
            let mut next = Vec::new();
            for node in &frontier {
                for role in self.direct_roles(node, domain) {
                    if role == name2 || self.name_matches(&role, name2) {
                        return Ok(true);
                    }
                    if visited.insert(role.clone()) {
                        next.push(role);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        Ok(false)
    }

    fn get_roles(&self, name: &str, domains: &[&str]) -> Result<Vec<String>, RbacError> {
        let domain = domain_key(domains)?;
        Ok(self.direct_roles(name, domain).into_iter().collect())
    }

    fn get_users(&self, name: &str, domains: &[&str]) -> Result<Vec<String>, RbacError> {
        let domain = domain_key(domains)?;
        let mut out = BTreeSet::new();
        for graph in self.graphs_for(domain) {
            for (role, users) in &graph.users {
                if self.name_matches(name, role) {
                    out.extend(users.iter().cloned());
                }
            }
        }
        Ok(out.into_iter().collect())
    }

    fn get_domains(&self, name: &str) -> Vec<String> {
        self.graphs
            .iter()
            .filter(|(key, graph)| !key.is_empty() && graph.roles.contains_key(name))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn get_all_domains(&self) -> Vec<String> {
        self.graphs
            .keys()
            .filter(|k| !k.is_empty())
            .cloned()
            .collect()
    }

    fn add_matching_fn(&mut self, name: &str, f: MatchingFn) {
        self.matching_fn = Some((name.to_string(), f));
    }

    fn add_domain_matching_fn(&mut self, name: &str, f: MatchingFn) {
        self.domain_matching_fn = Some((name.to_string(), f));
    }

    fn links(&self) -> Vec<Link> {
        let mut out = Vec::new();
        for (domain, graph) in &self.graphs {
            for (user, roles) in &graph.roles {
                for role in roles {
                    out.push(Link {
                        user: user.clone(),
                        role: role.clone(),
                        domain: (!domain.is_empty()).then(|| domain.clone()),
                    });
                }
            }
        }
        out
    }
}
