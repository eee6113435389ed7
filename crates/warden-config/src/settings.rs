// SPDX-License-Identifier: MIT OR Apache-2.0
//! TOML engine settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_error::ConfigError;

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsWarning {
    /// Enforcement is switched off, so every request is allowed.
    EnforcementDisabled,
    /// Auto-save is on but nothing will notify other instances.
    SilentAutoSave,
    /// The policy reload interval is very short.
    FrequentReload {
        /// Interval in seconds.
        secs: u64,
    },
}

impl std::fmt::Display for SettingsWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsWarning::EnforcementDisabled => {
                write!(f, "enforcement is disabled, every request will be allowed")
            }
            SettingsWarning::SilentAutoSave => {
                write!(f, "auto_save is on while auto_notify_watcher is off")
            }
            SettingsWarning::FrequentReload { secs } => {
                write!(f, "policy is reloaded every {secs}s")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime switches of an enforcer.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    /// When false every request is allowed without evaluation.
    pub enabled: bool,

    /// Emit model, request and role logs through the logger.
    pub log_enabled: bool,

    /// Log level for command-line front-ends (e.g. `"debug"`, `"info"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Persist every management call through the adapter.
    pub auto_save: bool,

    /// Patch role graphs whenever grouping rules change.
    pub auto_build_role_links: bool,

    /// Notify the watcher after successful mutations.
    pub auto_notify_watcher: bool,

    /// Maximum depth of role inheritance searched by the role manager.
    pub max_hierarchy_level: usize,

    /// Reload the policy periodically (synced enforcer only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_load_interval_secs: Option<u64>,

    /// Expiry of cached decisions (cached enforcer only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_enabled: false,
            log_level: Some("info".into()),
            auto_save: true,
            auto_build_role_links: true,
            auto_notify_watcher: true,
            max_hierarchy_level: DEFAULT_MAX_HIERARCHY_LEVEL,
            auto_load_interval_secs: None,
            cache_ttl_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default role inheritance depth.
pub const DEFAULT_MAX_HIERARCHY_LEVEL: usize = 10;

/// Upper bound accepted for `max_hierarchy_level`.
const MAX_HIERARCHY_LEVEL: usize = 1_000;

/// Reload intervals below this generate a warning.
const FREQUENT_RELOAD_THRESHOLD: u64 = 5;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load [`EngineSettings`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`EngineSettings::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_settings(path: Option<&Path>) -> Result<EngineSettings, ConfigError> {
    let mut settings = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => EngineSettings::default(),
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Parse a TOML string into [`EngineSettings`].
pub fn parse_toml(content: &str) -> Result<EngineSettings, ConfigError> {
    toml::from_str::<EngineSettings>(content).map_err(|e| ConfigError::Parse {
        line: e
            .span()
            .and_then(|span| content.get(..span.start))
            .map(|head| head.lines().count().max(1))
            .unwrap_or(0),
        reason: e.message().to_string(),
    })
}

/// Serialise settings back to TOML.
pub fn to_toml(settings: &EngineSettings) -> Result<String, ConfigError> {
    toml::to_string_pretty(settings).map_err(|e| ConfigError::Parse {
        line: 0,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `WARDEN_LOG_LEVEL`
/// - `WARDEN_LOG_ENABLED` (`true`/`false`)
/// - `WARDEN_AUTO_LOAD_INTERVAL_SECS`
pub fn apply_env_overrides(settings: &mut EngineSettings) {
    if let Ok(val) = std::env::var("WARDEN_LOG_LEVEL") {
        settings.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("WARDEN_LOG_ENABLED") {
        match val.parse() {
            Ok(enabled) => settings.log_enabled = enabled,
            Err(_) => tracing::warn!(target: "warden.config", value = %val, "ignoring WARDEN_LOG_ENABLED"),
        }
    }
    if let Ok(val) = std::env::var("WARDEN_AUTO_LOAD_INTERVAL_SECS") {
        match val.parse() {
            Ok(secs) => settings.auto_load_interval_secs = Some(secs),
            Err(_) => tracing::warn!(
                target: "warden.config",
                value = %val,
                "ignoring WARDEN_AUTO_LOAD_INTERVAL_SECS"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate settings, returning advisory warnings.
///
/// Hard errors come back as [`ConfigError::ValidationError`].
pub fn validate_settings(settings: &EngineSettings) -> Result<Vec<SettingsWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<SettingsWarning> = Vec::new();

    if let Some(ref level) = settings.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if settings.max_hierarchy_level == 0 || settings.max_hierarchy_level > MAX_HIERARCHY_LEVEL {
        errors.push(format!(
            "max_hierarchy_level {} out of range (1..={MAX_HIERARCHY_LEVEL})",
            settings.max_hierarchy_level
        ));
    }

    match settings.auto_load_interval_secs {
        Some(0) => errors.push("auto_load_interval_secs must be positive".into()),
        Some(secs) if secs < FREQUENT_RELOAD_THRESHOLD => {
            warnings.push(SettingsWarning::FrequentReload { secs });
        }
        _ => {}
    }

    if settings.cache_ttl_secs == Some(0) {
        errors.push("cache_ttl_secs must be positive".into());
    }

    if !settings.enabled {
        warnings.push(SettingsWarning::EnforcementDisabled);
    }
    if settings.auto_save && !settings.auto_notify_watcher {
        warnings.push(SettingsWarning::SilentAutoSave);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Defaults --

    #[test]
    fn defaults_are_valid_and_quiet() {
        let s = EngineSettings::default();
        assert!(s.enabled);
        assert!(s.auto_save);
        assert_eq!(s.max_hierarchy_level, 10);
        assert!(validate_settings(&s).unwrap().is_empty());
    }

    // -- 2. Partial TOML keeps defaults --

    #[test]
    fn partial_toml_fills_defaults() {
        let s = parse_toml("auto_save = false\nmax_hierarchy_level = 3\n").unwrap();
        assert!(!s.auto_save);
        assert_eq!(s.max_hierarchy_level, 3);
        assert!(s.auto_build_role_links);
        assert_eq!(s.log_level.as_deref(), Some("info"));
    }

    // -- 3. Parse errors --

    #[test]
    fn bad_toml_is_parse_error() {
        let err = parse_toml("enabled = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    // -- 4. Validation errors are collected --

    #[test]
    fn validation_collects_every_error() {
        let s = EngineSettings {
            log_level: Some("loud".into()),
            max_hierarchy_level: 0,
            auto_load_interval_secs: Some(0),
            ..EngineSettings::default()
        };
        match validate_settings(&s).unwrap_err() {
            ConfigError::ValidationError { reasons } => assert_eq!(reasons.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    // -- 5. Warnings --

    #[test]
    fn warnings_for_risky_switches() {
        let s = EngineSettings {
            enabled: false,
            auto_notify_watcher: false,
            auto_load_interval_secs: Some(1),
            ..EngineSettings::default()
        };
        let w = validate_settings(&s).unwrap();
        assert!(w.contains(&SettingsWarning::EnforcementDisabled));
        assert!(w.contains(&SettingsWarning::SilentAutoSave));
        assert!(w.contains(&SettingsWarning::FrequentReload { secs: 1 }));
        assert_eq!(
            SettingsWarning::FrequentReload { secs: 1 }.to_string(),
            "policy is reloaded every 1s"
        );
    }

    // -- 6. TOML round trip --

    #[test]
    fn toml_round_trip() {
        let s = EngineSettings {
            cache_ttl_secs: Some(30),
            ..EngineSettings::default()
        };
        let text = to_toml(&s).unwrap();
        assert_eq!(parse_toml(&text).unwrap(), s);
    }

    // -- 7. Missing file --

    #[test]
    fn missing_file_is_reported() {
        let err = load_settings(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    // -- 8. Schema --

    #[test]
    fn schema_lists_fields() {
        let schema = schemars::schema_for!(EngineSettings);
        let json = serde_json::to_value(&schema).unwrap();
        let props = json["properties"].as_object().unwrap();
        assert!(props.contains_key("auto_save"));
        assert!(props.contains_key("max_hierarchy_level"));
    }
}
