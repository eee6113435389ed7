// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz model text parsing.
//!
//! Arbitrary text must either fail with an error or produce a model that
//! can be rendered back to text.
#![no_main]
use libfuzzer_sys::fuzz_target;
use warden_model::Model;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // The INI layer on its own must not panic either.
    let _ = warden_config::Config::from_text(text);

    let Ok(model) = Model::from_text(text) else {
        return;
    };
    let _ = Model::from_text(&model.to_text());
    let _ = model.field_index("p", "sub");
});
