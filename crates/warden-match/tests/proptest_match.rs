// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests for `warden-match`.

use proptest::prelude::*;
use warden_match::{glob_match, key_get, key_match, key_match2, key_match3, key_match5};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}".prop_map(|s| s.to_string())
}

fn path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..=4).prop_map(|segs| format!("/{}", segs.join("/")))
}

// ── 1. Literal patterns match only themselves ──────────────────────

proptest! {
    #[test]
    fn literal_key_matches_itself(p in path()) {
        prop_assert!(key_match(&p, &p));
        prop_assert!(key_match2(&p, &p).unwrap());
        prop_assert!(key_match3(&p, &p).unwrap());
        prop_assert!(glob_match(&p, &p).unwrap());
    }
}

// ── 2. A trailing star swallows any suffix ─────────────────────────

proptest! {
    #[test]
    fn star_suffix_matches_and_key_get_recovers_it(prefix in path(), rest in path()) {
        let pattern = format!("{prefix}/*");
        let key = format!("{prefix}{rest}");
        prop_assert!(key_match(&key, &pattern));
        prop_assert!(key_match2(&key, &pattern).unwrap());
        prop_assert_eq!(key_get(&key, &pattern), rest[1..].to_string());
    }
}

// ── 3. Path parameters bind exactly one segment ────────────────────

proptest! {
    #[test]
    fn one_param_binds_one_segment(base in path(), a in segment(), b in segment()) {
        let one = format!("{base}/{a}");
        let two = format!("{base}/{a}/{b}");
        let colon_pat = format!("{base}/:id");
        let brace_pat = format!("{base}/{{id}}");
        prop_assert!(key_match2(&one, &colon_pat).unwrap());
        prop_assert!(!key_match2(&two, &colon_pat).unwrap());
        prop_assert!(key_match3(&one, &brace_pat).unwrap());
    }
}

// ── 4. Query strings never change key_match5 ───────────────────────

proptest! {
    #[test]
    fn query_suffix_is_ignored(p in path(), q in "[a-z]{1,5}=[0-9]{1,3}") {
        let with_query = format!("{p}?{q}");
        prop_assert_eq!(
            key_match5(&with_query, "/*").unwrap(),
            key_match5(&p, "/*").unwrap()
        );
    }
}

// ── 5. Matching never panics on arbitrary input ────────────────────

proptest! {
    #[test]
    fn arbitrary_input_never_panics(a in ".{0,24}", b in ".{0,24}") {
        let _ = key_match(&a, &b);
        let _ = key_get(&a, &b);
        let _ = key_match2(&a, &b);
        let _ = key_match3(&a, &b);
        let _ = key_match5(&a, &b);
        let _ = glob_match(&a, &b);
        let _ = warden_match::ip_match(&a, &b);
        let _ = warden_match::regex_match(&a, &b);
    }
}
