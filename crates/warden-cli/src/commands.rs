// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations for the `warden` binary.
//!
//! Library-level so they can be tested without spawning the binary.

use anyhow::{Context, Result};
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_config::{EngineSettings, validate_settings};
use warden_enforcer::Enforcer;
use warden_expr::Value;
use warden_model::Model;

/// Outcome of one `enforce` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforceReport {
    /// Request fields as given on the command line.
    pub request: Vec<String>,
    /// Final decision.
    pub allowed: bool,
    /// Rule that decided, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<Vec<String>>,
}

/// Build an enforcer from a model file and a policy file, then apply
/// `settings`. Advisory settings warnings are logged.
pub fn open_enforcer(model: &Path, policy: &Path, settings: &EngineSettings) -> Result<Enforcer> {
    for warning in validate_settings(settings).context("invalid settings")? {
        tracing::warn!(target: "warden.cli", %warning, "settings");
    }
    let mut e = Enforcer::from_files(model, policy).with_context(|| {
        format!(
            "load model '{}' with policy '{}'",
            model.display(),
            policy.display()
        )
    })?;
    e.apply_settings(settings).context("apply settings")?;
    Ok(e)
}

/// Parse one request field. Arguments starting with `{` or `[` are JSON
/// values, anything else is a plain string.
pub fn parse_field(arg: &str) -> Result<Value> {
    if arg.starts_with('{') || arg.starts_with('[') {
        let json: serde_json::Value =
            serde_json::from_str(arg).with_context(|| format!("parse JSON field '{arg}'"))?;
        return Ok(Value::from_json(json));
    }
    Ok(Value::from(arg))
}

/// Decide the request `fields` against the given files.
pub fn enforce(
    model: &Path,
    policy: &Path,
    fields: &[String],
    settings: &EngineSettings,
) -> Result<EnforceReport> {
    let e = open_enforcer(model, policy, settings)?;
    let values = fields
        .iter()
        .map(|f| parse_field(f))
        .collect::<Result<Vec<_>>>()?;
    let decision = e.enforce_ex(values).context("evaluate request")?;
    tracing::debug!(target: "warden.cli", allowed = decision.allowed, "decided");
    Ok(EnforceReport {
        request: fields.to_vec(),
        allowed: decision.allowed,
        explain: decision.explain,
    })
}

/// Roles of `user`, direct or implicit, optionally within `domain`.
pub fn roles(
    model: &Path,
    policy: &Path,
    user: &str,
    domain: Option<&str>,
    implicit: bool,
    settings: &EngineSettings,
) -> Result<Vec<String>> {
    let e = open_enforcer(model, policy, settings)?;
    let roles = if implicit {
        e.get_implicit_roles_for_user(user, domain)
    } else {
        e.get_roles_for_user(user, domain)
    };
    roles.with_context(|| format!("roles of '{user}'"))
}

/// Normalised text of the model at `path`.
pub fn model_text(path: &Path) -> Result<String> {
    let model = Model::from_file(path).with_context(|| format!("load model '{}'", path.display()))?;
    Ok(model.to_text())
}

/// JSON schema of the settings file.
pub fn settings_schema() -> Result<String> {
    let value = serde_json::to_value(schema_for!(EngineSettings))?;
    serde_json::to_string_pretty(&value).context("serialize schema")
}

/// Human-readable form of a report: the decision, then the deciding rule.
pub fn render_text(report: &EnforceReport) -> String {
    let verdict = if report.allowed { "allow" } else { "deny" };
    match &report.explain {
        Some(rule) => format!("{verdict}\nrule: {}", rule.join(", ")),
        None => verdict.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fields_become_structured_values() {
        assert_eq!(parse_field("alice").unwrap(), Value::from("alice"));
        let v = parse_field(r#"{"Age": 30}"#).unwrap();
        assert!(matches!(v, Value::Map(_)));
        assert!(parse_field("{not json").is_err());
    }

    #[test]
    fn text_rendering() {
        let mut report = EnforceReport {
            request: vec!["alice".into(), "data1".into(), "read".into()],
            allowed: true,
            explain: Some(vec!["alice".into(), "data1".into(), "read".into()]),
        };
        assert_eq!(render_text(&report), "allow\nrule: alice, data1, read");
        report.allowed = false;
        report.explain = None;
        assert_eq!(render_text(&report), "deny");
    }

    #[test]
    fn schema_names_every_setting() {
        let schema = settings_schema().unwrap();
        for key in ["enabled", "auto_save", "max_hierarchy_level", "cache_ttl_secs"] {
            assert!(schema.contains(key), "{key} missing");
        }
    }
}
