// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests for `warden-rbac`.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use warden_rbac::{DefaultRoleManager, RoleManager};

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(str::to_string)
}

fn edges() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((name(), name()), 0..16)
}

/// Reachability in at most `depth` hops by plain graph search.
fn reachable(edges: &[(String, String)], from: &str, to: &str, depth: usize) -> bool {
    if from == to {
        return true;
    }
    let mut adj: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (u, r) in edges {
        adj.entry(u.as_str()).or_default().insert(r.as_str());
    }
    let mut seen = BTreeSet::from([from]);
    let mut frontier = vec![from];
    for _ in 0..depth {
        let mut next = Vec::new();
        for n in frontier {
            for &r in adj.get(n).into_iter().flatten() {
                if r == to {
                    return true;
                }
                if seen.insert(r) {
                    next.push(r);
                }
            }
        }
        frontier = next;
    }
    false
}

// ── 1. has_link agrees with a reference search ─────────────────────

proptest! {
    #[test]
    fn has_link_matches_reference(es in edges(), from in name(), to in name(), depth in 1usize..5) {
        let mut rm = DefaultRoleManager::new(depth);
        for (u, r) in &es {
            rm.add_link(u, r, &[]).unwrap();
        }
        prop_assert_eq!(rm.has_link(&from, &to, &[]).unwrap(), reachable(&es, &from, &to, depth));
    }
}

// ── 2. Deleting every link leaves an empty manager ─────────────────

proptest! {
    #[test]
    fn add_then_delete_all_is_empty(es in edges()) {
        let mut rm = DefaultRoleManager::default();
        for (u, r) in &es {
            rm.add_link(u, r, &["dom"]).unwrap();
        }
        for (u, r) in &es {
            rm.delete_link(u, r, &["dom"]).unwrap();
        }
        prop_assert!(rm.links().is_empty());
        prop_assert!(rm.get_all_domains().is_empty());
    }
}

// ── 3. Direct roles and users mirror each other ────────────────────

proptest! {
    #[test]
    fn roles_and_users_are_inverse(es in edges(), n in name()) {
        let mut rm = DefaultRoleManager::default();
        for (u, r) in &es {
            rm.add_link(u, r, &[]).unwrap();
        }
        for role in rm.get_roles(&n, &[]).unwrap() {
            let users = rm.get_users(&role, &[]).unwrap();
            prop_assert!(users.contains(&n));
        }
    }
}

// ── 4. Links in one domain never leak into another ─────────────────

proptest! {
    #[test]
    fn domains_do_not_leak(es in edges(), from in name(), to in name()) {
        let mut rm = DefaultRoleManager::default();
        for (u, r) in &es {
            rm.add_link(u, r, &["d1"]).unwrap();
        }
        prop_assert_eq!(rm.has_link(&from, &to, &["d2"]).unwrap(), from == to);
    }
}
