// SPDX-License-Identifier: MIT OR Apache-2.0
//! Watcher notifications and logger callbacks seen from the outside.

use parking_lot::Mutex;
use std::sync::Arc;
use warden_enforcer::{Enforcer, Logger};
use warden_error::WatcherError;
use warden_expr::Value;
use warden_model::Model;
use warden_persist::{UpdateCallback, Watcher, WatcherEx};

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

fn enforcer() -> Enforcer {
    let mut e = Enforcer::new(Model::from_text(RBAC).unwrap()).unwrap();
    e.add_policy(["alice", "data1", "read"]).unwrap();
    e.add_policy(["admin", "data2", "write"]).unwrap();
    e.add_grouping_policy(["bob", "admin"]).unwrap();
    e
}

type Events = Arc<Mutex<Vec<String>>>;

// ── watchers ───────────────────────────────────────────────────────

/// Watcher with per-operation callbacks recording what it was told.
#[derive(Default)]
struct RecordingWatcher {
    events: Events,
    closed: Arc<Mutex<bool>>,
}

impl RecordingWatcher {
    fn push(&self, event: String) -> Result<(), WatcherError> {
        self.events.lock().push(event);
        Ok(())
    }
}

impl Watcher for RecordingWatcher {
    fn set_update_callback(&mut self, _callback: UpdateCallback) -> Result<(), WatcherError> {
        Ok(())
    }

    fn update(&mut self) -> Result<(), WatcherError> {
        self.push("update".into())
    }

    fn close(&mut self) {
        *self.closed.lock() = true;
    }

    fn as_ex(&mut self) -> Option<&mut dyn WatcherEx> {
        Some(self)
    }
}

impl WatcherEx for RecordingWatcher {
    fn update_for_add_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<(), WatcherError> {
        self.push(format!("add {sec} {ptype} {}", rule.join(",")))
    }

    fn update_for_remove_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), WatcherError> {
        self.push(format!("remove {sec} {ptype} {}", rule.join(",")))
    }

    fn update_for_remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<(), WatcherError> {
        self.push(format!("remove_filtered {sec} {ptype} {field_index} {}", field_values.join(",")))
    }

    fn update_for_save_policy(&mut self, _model: &Model) -> Result<(), WatcherError> {
        self.push("save".into())
    }

    fn update_for_add_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), WatcherError> {
        self.push(format!("add_many {sec} {ptype} {}", rules.len()))
    }

    fn update_for_remove_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), WatcherError> {
        self.push(format!("remove_many {sec} {ptype} {}", rules.len()))
    }

    fn update_for_update_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), WatcherError> {
        self.push(format!("update {sec} {ptype} {} -> {}", old.join(","), new.join(",")))
    }

    fn update_for_update_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        _new: &[Vec<String>],
    ) -> Result<(), WatcherError> {
        self.push(format!("update_many {sec} {ptype} {}", old.len()))
    }
}

/// Watcher with only the generic `update` notification.
struct CountingWatcher(Arc<Mutex<usize>>);

impl Watcher for CountingWatcher {
    fn set_update_callback(&mut self, _callback: UpdateCallback) -> Result<(), WatcherError> {
        Ok(())
    }

    fn update(&mut self) -> Result<(), WatcherError> {
        *self.0.lock() += 1;
        Ok(())
    }

    fn close(&mut self) {}
}

struct FailingWatcher;

impl Watcher for FailingWatcher {
    fn set_update_callback(&mut self, _callback: UpdateCallback) -> Result<(), WatcherError> {
        Ok(())
    }

    fn update(&mut self) -> Result<(), WatcherError> {
        Err(WatcherError::Notify("broker unreachable".into()))
    }

    fn close(&mut self) {}
}

#[test]
fn each_mutation_reaches_the_specific_callback() {
    let mut e = enforcer();
    let watcher = RecordingWatcher::default();
    let events = Arc::clone(&watcher.events);
    e.set_watcher(Box::new(watcher));

    e.add_policy(["carol", "data3", "read"]).unwrap();
    e.add_policy(["carol", "data3", "read"]).unwrap();
    e.remove_policy(["carol", "data3", "read"]).unwrap();
    e.add_grouping_policies(&[vec!["dave".into(), "admin".into()]])
        .unwrap();
    e.remove_filtered_grouping_policy(0, &["dave"]).unwrap();
    e.update_policy(&["alice", "data1", "read"], &["alice", "data1", "write"])
        .unwrap();
    e.save_policy().unwrap();

    assert_eq!(
        *events.lock(),
        [
            "add p p carol,data3,read",
            "remove p p carol,data3,read",
            "add_many g g 1",
            "remove_filtered g g 0 dave",
            "update p p alice,data1,read -> alice,data1,write",
            "save",
        ]
    );
}

#[test]
fn plain_watcher_gets_generic_updates() {
    let mut e = enforcer();
    let count = Arc::new(Mutex::new(0));
    e.set_watcher(Box::new(CountingWatcher(Arc::clone(&count))));
    e.add_policy(["carol", "data3", "read"]).unwrap();
    e.remove_policy(["carol", "data3", "read"]).unwrap();
    assert!(!e.remove_policy(["carol", "data3", "read"]).unwrap());
    assert_eq!(*count.lock(), 2);
}

#[test]
fn auto_notify_off_stays_silent() {
    let mut e = enforcer();
    let watcher = RecordingWatcher::default();
    let events = Arc::clone(&watcher.events);
    e.set_watcher(Box::new(watcher));
    e.enable_auto_notify_watcher(false);
    e.add_policy(["carol", "data3", "read"]).unwrap();
    e.save_policy().unwrap();
    assert!(events.lock().is_empty());
}

#[test]
fn replacing_the_watcher_closes_the_old_one() {
    let mut e = enforcer();
    let first = RecordingWatcher::default();
    let closed = Arc::clone(&first.closed);
    e.set_watcher(Box::new(first));
    e.set_watcher(Box::new(RecordingWatcher::default()));
    assert!(*closed.lock());
}

#[test]
fn watcher_failure_is_reported_but_change_stands() {
    let mut e = enforcer();
    e.set_watcher(Box::new(FailingWatcher));
    assert!(e.add_policy(["carol", "data3", "read"]).is_err());
    assert!(e.enforce(["carol", "data3", "read"]).unwrap());
}

// ── logger ─────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingLogger {
    enabled: bool,
    events: Events,
}

impl Logger for RecordingLogger {
    fn enable_log(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_model(&self, _model: &Model) {
        self.events.lock().push("model".into());
    }

    fn log_enforce(&self, _matcher: &str, request: &[Value], allowed: bool, explain: Option<&[String]>) {
        let request: Vec<String> = request.iter().map(ToString::to_string).collect();
        self.events.lock().push(format!(
            "enforce {} {allowed} {}",
            request.join(","),
            explain.map(|r| r.join(",")).unwrap_or_default()
        ));
    }

    fn log_role(&self, links: &[String]) {
        self.events.lock().push(format!("roles {}", links.len()));
    }

    fn log_policy(&self, _model: &Model) {
        self.events.lock().push("policy".into());
    }
}

#[test]
fn logger_sees_each_decision() {
    let mut e = enforcer();
    let logger = RecordingLogger::default();
    let events = Arc::clone(&logger.events);
    e.set_logger(Box::new(logger));

    e.enforce(["alice", "data1", "read"]).unwrap();
    e.enforce(["bob", "data2", "write"]).unwrap();
    e.enforce(["bob", "data1", "read"]).unwrap();

    assert_eq!(
        *events.lock(),
        [
            "enforce alice,data1,read true alice,data1,read",
            "enforce bob,data2,write true admin,data2,write",
            "enforce bob,data1,read false ",
        ]
    );
}

#[test]
fn enable_log_reaches_the_logger() {
    let mut e = enforcer();
    e.set_logger(Box::new(RecordingLogger::default()));
    assert!(!e.is_log_enabled());
    e.enable_log(true);
    assert!(e.is_log_enabled());
}
