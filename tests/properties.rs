// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cross-crate properties of the engine: reachability, domain isolation,
//! model text round-trip, duplicate adds and filtered loads.

use proptest::prelude::*;
use warden::persist::FilteredAdapter;
use warden::prelude::*;

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

fn name() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn domain() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["d1", "d2", "d3"]).prop_map(str::to_string)
}

fn field() -> impl Strategy<Value = String> {
    "[a-z0-9_/]{1,8}"
}

// ── 1. Role reachability is transitive ─────────────────────────────

proptest! {
    #[test]
    fn reachability_is_transitive(a in name(), b in name(), c in name()) {
        prop_assume!(a != b && b != c && a != c);
        let mut rm = DefaultRoleManager::default();
        rm.add_link(&a, &b, &[]).unwrap();
        rm.add_link(&b, &c, &[]).unwrap();
        prop_assert!(rm.has_link(&a, &c, &[]).unwrap());

        rm.delete_link(&b, &c, &[]).unwrap();
        prop_assert!(!rm.has_link(&a, &c, &[]).unwrap());
        prop_assert!(rm.has_link(&a, &b, &[]).unwrap());
    }
}

// ── 2. Domain isolation ────────────────────────────────────────────

proptest! {
    #[test]
    fn links_stay_in_their_domain(u in name(), r in name(), d1 in domain(), d2 in domain()) {
        prop_assume!(u != r && d1 != d2);
        let mut e = Enforcer::new(Model::from_text(DOMAINS).unwrap()).unwrap();
        e.add_role_for_user_in_domain(&u, &r, &d1).unwrap();
        e.add_policy([r.as_str(), d2.as_str(), "obj", "act"]).unwrap();

        let rm = e.role_manager().unwrap();
        prop_assert!(rm.has_link(&u, &r, &[d1.as_str()]).unwrap());
        prop_assert!(!rm.has_link(&u, &r, &[d2.as_str()]).unwrap());
        prop_assert!(!e.enforce([u.as_str(), d2.as_str(), "obj", "act"]).unwrap());
    }
}

// ── 3. Model text round-trip ───────────────────────────────────────

proptest! {
    #[test]
    fn text_round_trip_keeps_definitions(
        fields in prop::collection::btree_set("[a-z]{2,6}", 1..5),
    ) {
        let fields: Vec<String> = fields.into_iter().collect();
        let list = fields.join(", ");
        let matcher = fields
            .iter()
            .map(|f| format!("r.{f} == p.{f}"))
            .collect::<Vec<_>>()
            .join(" && ");
        let text = format!(
            "[request_definition]\nr = {list}\n[policy_definition]\np = {list}\n\
             [policy_effect]\ne = some(where (p.eft == allow))\n[matchers]\nm = {matcher}\n"
        );
        let first = Model::from_text(&text).unwrap();
        let second = Model::from_text(&first.to_text()).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_text(), second.to_text());
    }
}

// ── 4. Duplicate adds are no-ops ───────────────────────────────────

proptest! {
    #[test]
    fn second_add_changes_nothing(sub in field(), obj in field(), act in field()) {
        let model = Model::from_text(DOMAINS).unwrap();
        let mut e = Enforcer::with_adapter(model, Box::new(MemoryAdapter::new())).unwrap();
        let rule = [sub.as_str(), "d1", obj.as_str(), act.as_str()];
        prop_assert!(e.add_policy(rule).unwrap());
        prop_assert!(!e.add_policy(rule).unwrap());
        prop_assert_eq!(e.get_policy().len(), 1);
        prop_assert!(!e.add_policies(&[rule.map(String::from).to_vec()]).unwrap());
    }
}

// ── 5. Filtered loads keep exactly the selected rows ───────────────

proptest! {
    #[test]
    fn filtered_load_is_exact(
        rows in prop::collection::vec((name(), domain(), field()), 1..20),
        keep in domain(),
    ) {
        let text: String = rows
            .iter()
            .map(|(s, d, o)| format!("p, {s}, {d}, {o}, read\n"))
            .collect();
        let mut adapter = MemoryAdapter::from_text(&text);
        let mut model = Model::from_text(DOMAINS).unwrap();
        let filter = Filter::new().with("p", ["", keep.as_str()]);
        adapter.load_filtered_policy(&mut model, Some(&filter)).unwrap();

        let loaded = model.get_policy("p", "p");
        prop_assert!(loaded.iter().all(|r| r[1] == keep));
        let expected = rows.iter().filter(|(_, d, _)| *d == keep).count();
        let mut distinct: Vec<_> = rows.iter().filter(|(_, d, _)| *d == keep).collect();
        distinct.sort();
        distinct.dedup();
        prop_assert!(loaded.len() <= expected);
        prop_assert_eq!(loaded.len(), distinct.len());

        let mut e = Enforcer::with_adapter(Model::from_text(DOMAINS).unwrap(), Box::new(adapter)).unwrap();
        e.load_filtered_policy(&filter).unwrap();
        prop_assert!(e.is_filtered());
        prop_assert!(e.save_policy().is_err());
    }
}
