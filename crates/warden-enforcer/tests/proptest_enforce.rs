// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property tests for decisions and role links maintained through the
//! management API.

use proptest::prelude::*;
use warden_enforcer::{CachedEnforcer, Enforcer};
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

const NAMES: [&str; 5] = ["alice", "bob", "carol", "admin", "staff"];
const OBJECTS: [&str; 2] = ["data1", "data2"];
const ACTIONS: [&str; 2] = ["read", "write"];

fn pick(choices: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::sample::select(choices).prop_map(str::to_string)
}

fn policy_rule() -> impl Strategy<Value = Vec<String>> {
    (pick(&NAMES), pick(&OBJECTS), pick(&ACTIONS)).prop_map(|(s, o, a)| vec![s, o, a])
}

fn grouping_rule() -> impl Strategy<Value = Vec<String>> {
    (pick(&NAMES), pick(&NAMES)).prop_map(|(u, r)| vec![u, r])
}

#[derive(Debug, Clone)]
enum Op {
    AddPolicy(Vec<String>),
    RemovePolicy(Vec<String>),
    AddLink(Vec<String>),
    RemoveLink(Vec<String>),
    DeleteUser(String),
    UpdateLink(Vec<String>, Vec<String>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => policy_rule().prop_map(Op::AddPolicy),
        1 => policy_rule().prop_map(Op::RemovePolicy),
        3 => grouping_rule().prop_map(Op::AddLink),
        2 => grouping_rule().prop_map(Op::RemoveLink),
        1 => pick(&NAMES).prop_map(Op::DeleteUser),
        1 => (grouping_rule(), grouping_rule()).prop_map(|(a, b)| Op::UpdateLink(a, b)),
    ]
}

fn apply(e: &mut Enforcer, op: &Op) {
    match op {
        Op::AddPolicy(r) => {
            e.add_policy(r.clone()).unwrap();
        }
        Op::RemovePolicy(r) => {
            e.remove_policy(r.clone()).unwrap();
        }
        Op::AddLink(r) => {
            e.add_grouping_policy(r.clone()).unwrap();
        }
        Op::RemoveLink(r) => {
            e.remove_grouping_policy(r.clone()).unwrap();
        }
        Op::DeleteUser(u) => {
            e.delete_user(u).unwrap();
        }
        Op::UpdateLink(old, new) => {
            let old: Vec<&str> = old.iter().map(String::as_str).collect();
            let new: Vec<&str> = new.iter().map(String::as_str).collect();
            e.update_grouping_policy(&old, &new).unwrap();
        }
    }
}

fn every_request() -> Vec<[&'static str; 3]> {
    let mut out = Vec::new();
    for s in NAMES {
        for o in OBJECTS {
            for a in ACTIONS {
                out.push([s, o, a]);
            }
        }
    }
    out
}

// ── 1. Determinism ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn same_request_same_decision(ops in prop::collection::vec(op(), 0..30)) {
        let mut e = Enforcer::new(Model::from_text(RBAC).unwrap()).unwrap();
        ops.iter().for_each(|op| apply(&mut e, op));
        for req in every_request() {
            let first = e.enforce_ex(req).unwrap();
            let second = e.enforce_ex(req).unwrap();
            prop_assert_eq!(first.allowed, second.allowed);
            prop_assert_eq!(first.explain, second.explain);
        }
    }
}

// ── 2. Incremental role links equal a fresh build ──────────────────

proptest! {
    #[test]
    fn patched_links_match_rebuilt_links(ops in prop::collection::vec(op(), 0..40)) {
        let mut patched = Enforcer::new(Model::from_text(RBAC).unwrap()).unwrap();
        ops.iter().for_each(|op| apply(&mut patched, op));
        let rebuilt = Enforcer::new(patched.model().clone()).unwrap();

        for name in NAMES {
            prop_assert_eq!(
                patched.get_implicit_roles_for_user(name, None).unwrap(),
                rebuilt.get_implicit_roles_for_user(name, None).unwrap()
            );
        }
        for req in every_request() {
            prop_assert_eq!(patched.enforce(req).unwrap(), rebuilt.enforce(req).unwrap());
        }
    }
}

// ── 3. Cached answers equal uncached answers ───────────────────────

proptest! {
    #[test]
    fn cache_never_changes_decisions(
        ops in prop::collection::vec(op(), 0..30),
        removals in prop::collection::vec(policy_rule(), 0..5),
    ) {
        let mut e = Enforcer::new(Model::from_text(RBAC).unwrap()).unwrap();
        ops.iter().for_each(|op| apply(&mut e, op));
        let mut cached = CachedEnforcer::new(e);

        for req in every_request() {
            cached.enforce(req).unwrap();
        }
        for rule in removals {
            cached.remove_policy(rule).unwrap();
        }
        for req in every_request() {
            prop_assert_eq!(cached.enforce(req).unwrap(), cached.enforce_ex(req).unwrap().allowed);
        }
    }
}
