// SPDX-License-Identifier: MIT OR Apache-2.0

use warden_expr::Value;
use warden_model::Model;

/// Sink for model, policy, role and decision events.
///
/// The enforcer calls every method unconditionally; implementations check
/// their own enabled flag.
pub trait Logger: Send + Sync {
    /// Turn logging on or off.
    fn enable_log(&mut self, enabled: bool);

    /// Whether logging is on.
    fn is_enabled(&self) -> bool;

    /// A model was loaded.
    fn log_model(&self, model: &Model);

    /// One enforcement call finished.
    fn log_enforce(&self, matcher: &str, request: &[Value], allowed: bool, explain: Option<&[String]>);

    /// Role links were rebuilt.
    fn log_role(&self, links: &[String]);

    /// A policy was loaded.
    fn log_policy(&self, model: &Model);
}

/// [`Logger`] emitting `tracing` events under target `warden`.
#[derive(Debug, Default)]
pub struct DefaultLogger {
    enabled: bool,
}

impl DefaultLogger {
    /// Disabled logger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for DefaultLogger {
    fn enable_log(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_model(&self, model: &Model) {
        if !self.is_enabled() {
            return;
        }
        for (sec, ast) in model.iter() {
            tracing::info!(target: "warden", section = sec, key = %ast.key, value = %ast.value, "model");
        }
    }

    fn log_enforce(&self, matcher: &str, request: &[Value], allowed: bool, explain: Option<&[String]>) {
        if !self.is_enabled() {
            return;
        }
        let request: Vec<String> = request.iter().map(ToString::to_string).collect();
        tracing::info!(
            target: "warden",
            matcher,
            request = %request.join(", "),
            allowed,
            explain = ?explain,
            "enforce"
        );
    }

    fn log_role(&self, links: &[String]) {
        if !self.is_enabled() {
            return;
        }
        tracing::info!(target: "warden", links = %links.join("; "), "roles");
    }

    fn log_policy(&self, model: &Model) {
        if !self.is_enabled() {
            return;
        }
        for sec in ["p", "g"] {
            for (ptype, ast) in model.assertions(sec) {
                tracing::info!(target: "warden", ptype, rules = ast.policy().len(), "policy");
            }
        }
    }
}
