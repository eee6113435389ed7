// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::filter::Filter;
use crate::rows::PolicyRows;
use crate::{Adapter, BatchAdapter, FilteredAdapter, UpdatableAdapter};
use warden_error::AdapterError;
use warden_model::Model;

/// In-memory store supporting every adapter capability.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    rows: PolicyRows,
    filtered: bool,
}

impl MemoryAdapter {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from policy text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rows: PolicyRows::parse(text),
            filtered: false,
        }
    }

    /// Stored rules as policy text.
    pub fn text(&self) -> String {
        self.rows.to_text()
    }
}

impl Adapter for MemoryAdapter {
    fn load_policy(&mut self, model: &mut Model) -> Result<(), AdapterError> {
        self.filtered = false;
        self.rows.load_into(model, None)
    }

    fn save_policy(&mut self, model: &Model) -> Result<(), AdapterError> {
        if self.filtered {
            return Err(AdapterError::FilteredSave);
        }
        self.rows = PolicyRows::from_model(model);
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    fn as_batch(&mut self) -> Option<&mut dyn BatchAdapter> {
        Some(self)
    }

    fn as_updatable(&mut self) -> Option<&mut dyn UpdatableAdapter> {
        Some(self)
    }

    fn as_filtered(&mut self) -> Option<&mut dyn FilteredAdapter> {
        Some(self)
    }
}

impl BatchAdapter for MemoryAdapter {
    fn add_policy(&mut self, _sec: &str, ptype: &str, rule: &[String]) -> Result<(), AdapterError> {
        self.rows.add(ptype, rule);
        Ok(())
    }

    fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        rules.iter().for_each(|r| self.rows.add(ptype, r));
        Ok(())
    }

    fn remove_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), AdapterError> {
        self.rows.remove(ptype, rule);
        Ok(())
    }

    fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        rules.iter().for_each(|r| self.rows.remove(ptype, r));
        Ok(())
    }

    fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<(), AdapterError> {
        self.rows.remove_filtered(ptype, field_index, field_values);
        Ok(())
    }
}

impl UpdatableAdapter for MemoryAdapter {
    fn update_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), AdapterError> {
        self.rows.update(ptype, old, new);
        Ok(())
    }

    fn update_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        for (o, n) in old.iter().zip(new) {
            self.rows.update(ptype, o, n);
        }
        Ok(())
    }

    fn update_filtered_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<Vec<Vec<String>>, AdapterError> {
        let removed = self.rows.remove_filtered(ptype, field_index, field_values);
        new.iter().for_each(|r| self.rows.add(ptype, r));
        Ok(removed)
    }
}

impl FilteredAdapter for MemoryAdapter {
    fn load_filtered_policy(
        &mut self,
        model: &mut Model,
        filter: Option<&Filter>,
    ) -> Result<(), AdapterError> {
        self.rows.load_into(model, filter)?;
        self.filtered = filter.is_some();
        Ok(())
    }
}
