// SPDX-License-Identifier: MIT OR Apache-2.0
//! INI-like reader for model definitions.

use std::collections::BTreeMap;
use std::path::Path;
use warden_error::ConfigError;

/// Section used for keys that appear before any `[section]` header.
pub const DEFAULT_SECTION: &str = "default";

const COMMENT: char = '#';
const COMMENT_SEM: char = ';';
const CONTINUATION: char = '\\';

/// Parsed `section -> key -> value` table.
///
/// Lookups take either `key` (default section) or `section::key`, and are
/// case-insensitive on the lookup side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    data: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_text(&text)
    }

    /// Parse definition text.
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.parse(text)?;
        Ok(config)
    }

    /// Insert or replace a value. Returns `true` when the key was new.
    pub fn add_config(&mut self, section: &str, option: &str, value: &str) -> bool {
        let section = if section.is_empty() {
            DEFAULT_SECTION
        } else {
            section
        };
        self.data
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value.to_string())
            .is_none()
    }

    fn parse(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut section = String::new();
        let mut buffer = String::new();
        let mut line_num = 0;

        for raw in text.lines() {
            line_num += 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(COMMENT) || line.starts_with(COMMENT_SEM) {
                self.flush(&section, line_num, &mut buffer)?;
                continue;
            }

            if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
                self.flush(&section, line_num, &mut buffer)?;
                section = line[1..line.len() - 1].to_string();
                continue;
            }

            let (part, complete) = match line.strip_suffix(CONTINUATION) {
                Some(head) => (format!("{} ", head.trim()), false),
                None => (line.to_string(), true),
            };
            let end = part.find([COMMENT, COMMENT_SEM]).unwrap_or(part.len());
            buffer.push_str(&part[..end]);

            if complete {
                self.flush(&section, line_num, &mut buffer)?;
            }
        }

        self.flush(&section, line_num, &mut buffer)
    }

    fn flush(&mut self, section: &str, line: usize, buffer: &mut String) -> Result<(), ConfigError> {
        if buffer.trim().is_empty() {
            buffer.clear();
            return Ok(());
        }
        let Some((option, value)) = buffer.split_once('=') else {
            return Err(ConfigError::Parse {
                line,
                reason: format!("{} = ?", buffer.trim()),
            });
        };
        self.add_config(section, option.trim(), value.trim());
        buffer.clear();
        Ok(())
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        let (section, option) = match key.split_once("::") {
            Some((section, option)) => (section.to_string(), option.to_string()),
            None => (DEFAULT_SECTION.to_string(), key),
        };
        self.data
            .get(&section)
            .and_then(|s| s.get(&option))
            .map(String::as_str)
    }

    /// Raw value, `None` when absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup(key)
    }

    /// Value or `""` when absent.
    pub fn string(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default().to_string()
    }

    /// Comma-split value; empty when absent.
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.lookup(key) {
            None | Some("") => Vec::new(),
            Some(v) => v.split(',').map(str::to_string).collect(),
        }
    }

    /// Boolean value (`1 t T TRUE true True` and their false counterparts).
    pub fn bool(&self, key: &str) -> Result<bool, ConfigError> {
        let raw = self.lookup(key).unwrap_or_default();
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(invalid(key, raw, "bool")),
        }
    }

    /// Integer value.
    pub fn int(&self, key: &str) -> Result<i64, ConfigError> {
        let raw = self.lookup(key).unwrap_or_default();
        raw.parse().map_err(|_| invalid(key, raw, "integer"))
    }

    /// Floating-point value.
    pub fn float(&self, key: &str) -> Result<f64, ConfigError> {
        let raw = self.lookup(key).unwrap_or_default();
        raw.parse().map_err(|_| invalid(key, raw, "float"))
    }

    /// Set `key` or `section::key`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        let key = key.to_lowercase();
        match key.split_once("::") {
            Some((section, option)) => self.add_config(section, option, value),
            None => self.add_config("", &key, value),
        };
        Ok(())
    }

    /// Section names in sorted order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Key/value pairs of one section.
    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.data.get(name)
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}
