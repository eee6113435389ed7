// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reads a multi-section INI fixture covering comments and continuations.

use std::io::Write;
use std::path::PathBuf;
use warden_config::{Config, load_settings};

fn fixture() -> Config {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample.ini");
    Config::from_file(path).expect("fixture parses")
}

#[test]
fn default_section_keys() {
    let cfg = fixture();
    assert!(cfg.bool("debug").unwrap());
    assert_eq!(cfg.string("url"), "act.wiki");
}

#[test]
fn dotted_keys_inside_sections() {
    let cfg = fixture();
    assert_eq!(cfg.strings("redis::redis.key"), vec!["push1", "push2"]);
    assert_eq!(cfg.string("mysql::mysql.dev.host"), "127.0.0.1");
    assert_eq!(cfg.string("mysql::mysql.master.host"), "10.0.0.1");
    assert_eq!(cfg.string("mysql::mysql.master.pass"), "89dds)2$");
    assert_eq!(cfg.int("math::math.i64").unwrap(), 64);
    assert!((cfg.float("math::math.f64").unwrap() - 64.1).abs() < 1e-9);
}

#[test]
fn continuation_lines_join_with_a_space() {
    let cfg = fixture();
    for section in ["multi1", "multi2", "multi3", "multi5"] {
        assert_eq!(
            cfg.string(&format!("{section}::name")),
            "r.sub==p.sub && r.obj==p.obj",
            "section {section}"
        );
    }
    assert_eq!(cfg.string("multi4::name"), "");
}

#[test]
fn set_overrides_value() {
    let mut cfg = fixture();
    cfg.set("other::key1", "new test key").unwrap();
    assert_eq!(cfg.string("other::key1"), "new test key");
    cfg.set("other::key1", "test key").unwrap();
    assert_eq!(cfg.string("other::key1"), "test key");
}

#[test]
fn missing_file_is_reported() {
    assert!(Config::from_file("/no/such/model.conf").is_err());
}

#[test]
fn settings_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "enabled = true\nauto_save = false\ncache_ttl_secs = 60").unwrap();
    let s = load_settings(Some(file.path())).unwrap();
    assert!(!s.auto_save);
    assert_eq!(s.cache_ttl_secs, Some(60));
}
