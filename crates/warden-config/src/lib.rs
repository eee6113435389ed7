// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration for the warden authorization engine.
//!
//! [`Config`] reads the INI-like model definition format. [`EngineSettings`]
//! holds the TOML runtime switches of an enforcer, together with helpers for
//! loading, environment overrides and validation.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ini;
mod settings;

pub use ini::{Config, DEFAULT_SECTION};
pub use settings::{
    DEFAULT_MAX_HIERARCHY_LEVEL, EngineSettings, SettingsWarning, apply_env_overrides,
    load_settings, parse_toml, to_toml, validate_settings,
};
pub use warden_error::ConfigError;
