// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::filter::Filter;
use crate::rows::{PolicyRows, load_policy_text};
use crate::{Adapter, BatchAdapter, FilteredAdapter, UpdatableAdapter};
use std::io;
use std::path::{Path, PathBuf};
use warden_error::AdapterError;
use warden_model::Model;

/// Policy stored in a text file, one rule per line.
#[derive(Debug, Clone)]
pub struct FileAdapter {
    path: PathBuf,
}

impl FileAdapter {
    /// Adapter reading and writing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_path(&self) -> Result<(), AdapterError> {
        if self.path.as_os_str().is_empty() {
            return Err(AdapterError::EmptyPath);
        }
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> AdapterError {
        AdapterError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> Result<String, AdapterError> {
        self.check_path()?;
        std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))
    }

    fn write(&self, text: &str) -> Result<(), AdapterError> {
        self.check_path()?;
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))
    }

    fn load(&self, model: &mut Model, filter: Option<&Filter>) -> Result<(), AdapterError> {
        let text = self.read()?;
        load_policy_text(&text, model, filter)?;
        tracing::debug!(target: "warden.persist", path = %self.path.display(), filtered = filter.is_some(), "policy file loaded");
        Ok(())
    }

    /// Read the file, edit its rows, write it back. A missing file counts as
    /// empty.
    fn rewrite<T>(&self, edit: impl FnOnce(&mut PolicyRows) -> T) -> Result<T, AdapterError> {
        let text = match self.read() {
            Ok(text) => text,
            Err(AdapterError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                String::new()
            }
            Err(e) => return Err(e),
        };
        let mut rows = PolicyRows::parse(&text);
        let out = edit(&mut rows);
        self.write(&rows.to_text())?;
        Ok(out)
    }
}

impl Adapter for FileAdapter {
    fn load_policy(&mut self, model: &mut Model) -> Result<(), AdapterError> {
        self.load(model, None)
    }

    fn save_policy(&mut self, model: &Model) -> Result<(), AdapterError> {
        self.write(&PolicyRows::from_model(model).to_text())
    }

    fn as_batch(&mut self) -> Option<&mut dyn BatchAdapter> {
        Some(self)
    }

    fn as_updatable(&mut self) -> Option<&mut dyn UpdatableAdapter> {
        Some(self)
    }
}

impl BatchAdapter for FileAdapter {
    fn add_policy(&mut self, _sec: &str, ptype: &str, rule: &[String]) -> Result<(), AdapterError> {
        self.rewrite(|rows| rows.add(ptype, rule))
    }

    fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        self.rewrite(|rows| rules.iter().for_each(|r| rows.add(ptype, r)))
    }

    fn remove_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), AdapterError> {
        self.rewrite(|rows| rows.remove(ptype, rule))
    }

    fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        self.rewrite(|rows| rules.iter().for_each(|r| rows.remove(ptype, r)))
    }

    fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<(), AdapterError> {
        self.rewrite(|rows| {
            rows.remove_filtered(ptype, field_index, field_values);
        })
    }
}

impl UpdatableAdapter for FileAdapter {
    fn update_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), AdapterError> {
        self.rewrite(|rows| rows.update(ptype, old, new))
    }

    fn update_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        self.rewrite(|rows| {
            for (o, n) in old.iter().zip(new) {
                rows.update(ptype, o, n);
            }
        })
    }

    fn update_filtered_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<Vec<Vec<String>>, AdapterError> {
        self.rewrite(|rows| {
            let removed = rows.remove_filtered(ptype, field_index, field_values);
            for r in new {
                rows.add(ptype, r);
            }
            removed
        })
    }
}

/// [`FileAdapter`] that can load a filtered subset.
///
/// Starts in the filtered state, so a freshly built enforcer does not load
/// the whole file through it. Saving is refused while filtered.
#[derive(Debug, Clone)]
pub struct FilteredFileAdapter {
    inner: FileAdapter,
    filtered: bool,
}

impl FilteredFileAdapter {
    /// Adapter over `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: FileAdapter::new(path),
            filtered: true,
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

impl Adapter for FilteredFileAdapter {
    fn load_policy(&mut self, model: &mut Model) -> Result<(), AdapterError> {
        self.filtered = false;
        self.inner.load_policy(model)
    }

    fn save_policy(&mut self, model: &Model) -> Result<(), AdapterError> {
        if self.filtered {
            return Err(AdapterError::FilteredSave);
        }
        self.inner.save_policy(model)
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    fn as_batch(&mut self) -> Option<&mut dyn BatchAdapter> {
        Some(&mut self.inner)
    }

    fn as_updatable(&mut self) -> Option<&mut dyn UpdatableAdapter> {
        Some(&mut self.inner)
    }

    fn as_filtered(&mut self) -> Option<&mut dyn FilteredAdapter> {
        Some(self)
    }
}

impl FilteredAdapter for FilteredFileAdapter {
    fn load_filtered_policy(
        &mut self,
        model: &mut Model,
        filter: Option<&Filter>,
    ) -> Result<(), AdapterError> {
        let Some(filter) = filter else {
            return self.load_policy(model);
        };
        self.inner.load(model, Some(filter))?;
        self.filtered = true;
        Ok(())
    }
}
