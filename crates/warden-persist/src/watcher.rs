// SPDX-License-Identifier: MIT OR Apache-2.0

use warden_error::WatcherError;
use warden_model::Model;

/// Called by a watcher when another instance changed the policy. The
/// argument is a watcher-specific message.
pub type UpdateCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Change notification between enforcer instances.
pub trait Watcher: Send + Sync {
    /// Install the callback run on remote changes.
    fn set_update_callback(&mut self, callback: UpdateCallback) -> Result<(), WatcherError>;

    /// Tell other instances the policy changed.
    fn update(&mut self) -> Result<(), WatcherError>;

    /// Stop watching. The callback is not called afterwards.
    fn close(&mut self);

    /// Per-operation notifications, if supported.
    fn as_ex(&mut self) -> Option<&mut dyn WatcherEx> {
        None
    }
}

/// Watcher told exactly what changed.
pub trait WatcherEx {
    /// After `add_policy`.
    fn update_for_add_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), WatcherError>;

    /// After `remove_policy`.
    fn update_for_remove_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), WatcherError>;

    /// After `remove_filtered_policy`.
    fn update_for_remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[&str],
    ) -> Result<(), WatcherError>;

    /// After `save_policy`.
    fn update_for_save_policy(&mut self, model: &Model) -> Result<(), WatcherError>;

    /// After `add_policies`.
    fn update_for_add_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), WatcherError>;

    /// After `remove_policies`.
    fn update_for_remove_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), WatcherError>;

    /// After `update_policy`.
    fn update_for_update_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[String],
        new: &[String],
    ) -> Result<(), WatcherError>;

    /// After `update_policies`.
    fn update_for_update_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> Result<(), WatcherError>;
}
