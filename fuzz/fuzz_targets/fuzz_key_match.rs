// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz the builtin matching functions with arbitrary keys and patterns.
#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct MatchInput {
    key: String,
    pattern: String,
}

const NAMES: [&str; 8] = [
    "keyMatch",
    "keyMatch2",
    "keyMatch3",
    "keyMatch4",
    "keyMatch5",
    "regexMatch",
    "ipMatch",
    "globMatch",
];

fuzz_target!(|input: MatchInput| {
    for name in NAMES {
        if let Some(f) = warden_match::predicate(name) {
            let _ = f(&input.key, &input.pattern);
        }
    }
    let _ = warden_match::key_get(&input.key, &input.pattern);
    let _ = warden_match::key_get2(&input.key, &input.pattern, "id");

    // Every key matches itself literally under keyMatch.
    if !input.key.contains('*') {
        assert!(warden_match::key_match(&input.key, &input.key));
    }
});
