// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Adapter;
use crate::rows::{load_policy_text, policy_text};
use warden_error::AdapterError;
use warden_model::Model;

/// Policy held as text in memory. Supports whole-policy load and save only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringAdapter {
    text: String,
}

impl StringAdapter {
    /// Adapter over `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Current policy text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Adapter for StringAdapter {
    fn load_policy(&mut self, model: &mut Model) -> Result<(), AdapterError> {
        load_policy_text(&self.text, model, None)
    }

    fn save_policy(&mut self, model: &Model) -> Result<(), AdapterError> {
        self.text = policy_text(model);
        Ok(())
    }
}
