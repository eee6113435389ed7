//! warden-persist
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Persistence and change-notification collaborators.
//!
//! Every adapter implements [`Adapter`]. Optional capabilities are exposed
//! through the `as_*` accessors, so the enforcer asks an adapter what it can
//! do instead of guessing from its type.

mod file;
mod filter;
mod memory;
mod rows;
mod string;
mod watcher;

pub use file::{FileAdapter, FilteredFileAdapter};
pub use filter::Filter;
pub use memory::MemoryAdapter;
pub use rows::{load_policy_text, policy_text};
pub use string::StringAdapter;
pub use watcher::{UpdateCallback, Watcher, WatcherEx};
pub use warden_error::{AdapterError, WatcherError};

use warden_model::Model;

/// Load and save the whole policy.
pub trait Adapter: Send + Sync {
    /// Append every stored rule to `model`.
    fn load_policy(&mut self, model: &mut Model) -> Result<(), AdapterError>;

    /// Replace the stored rules with the rules of `model`.
    fn save_policy(&mut self, model: &Model) -> Result<(), AdapterError>;

    /// Whether the last load was filtered.
    fn is_filtered(&self) -> bool {
        false
    }

    /// Single and batch rule persistence, if supported.
    fn as_batch(&mut self) -> Option<&mut dyn BatchAdapter> {
        None
    }

    /// In-place rule updates, if supported.
    fn as_updatable(&mut self) -> Option<&mut dyn UpdatableAdapter> {
        None
    }

    /// Filtered loading, if supported.
    fn as_filtered(&mut self) -> Option<&mut dyn FilteredAdapter> {
        None
    }
}

/// Persist individual rule additions and removals.
pub trait BatchAdapter {
    /// Store one rule.
    fn add_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> Result<(), AdapterError>;

    /// Store several rules.
    fn add_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Delete one rule.
    fn remove_policy(&mut self, sec: &str, ptype: &str, rule: &[String])
    -> Result<(), AdapterError>;

    /// Delete several rules.
    fn remove_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Delete every rule whose fields from `field_index` match `field_values`.
    fn remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<(), AdapterError>;
}

/// Persist in-place rule replacement.
pub trait UpdatableAdapter {
    /// Replace `old` with `new`.
    fn update_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), AdapterError>;

    /// Replace `old[i]` with `new[i]`.
    fn update_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Delete the rules matching the field filter, store `new`, and return
    /// the deleted rules.
    fn update_filtered_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        new: &[Vec<String>],
        field_index: usize,
        field_values: &[&str],
    ) -> Result<Vec<Vec<String>>, AdapterError>;
}

/// Load a subset of the stored rules.
pub trait FilteredAdapter {
    /// Append the rules selected by `filter` to `model`. `None` loads
    /// everything and clears the filtered state.
    fn load_filtered_policy(
        &mut self,
        model: &mut Model,
        filter: Option<&Filter>,
    ) -> Result<(), AdapterError>;
}
