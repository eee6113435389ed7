// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::logger::{DefaultLogger, Logger};
use crate::matcher::MatcherCache;
use std::fmt;
use std::path::Path;
use warden_config::EngineSettings;
use warden_effect::{DefaultEffector, Effector};
use warden_error::{AdapterError, Result, WatcherError};
use warden_expr::{Function, FunctionMap};
use warden_model::{Model, RoleManagers, builtin_functions};
use warden_persist::{
    Adapter, BatchAdapter, FileAdapter, Filter, UpdatableAdapter, Watcher, WatcherEx,
};
use warden_rbac::{DEFAULT_MAX_HIERARCHY_LEVEL, DefaultRoleManager, MatchingFn, RoleManager};

/// The authorization engine.
///
/// Owns the [`Model`] with its policy tables, one role manager per grouping
/// type, the matcher function table and the optional persistence and
/// notification collaborators. Reads take `&self`; every mutation takes
/// `&mut self`, so sharing an enforcer across threads goes through
/// [`SyncedEnforcer`](crate::SyncedEnforcer).
pub struct Enforcer {
    pub(crate) model: Model,
    pub(crate) functions: FunctionMap,
    pub(crate) rms: RoleManagers,
    pub(crate) effector: Box<dyn Effector>,
    pub(crate) adapter: Option<Box<dyn Adapter>>,
    pub(crate) watcher: Option<Box<dyn Watcher>>,
    pub(crate) logger: Box<dyn Logger>,
    pub(crate) matchers: MatcherCache,
    pub(crate) enabled: bool,
    pub(crate) auto_save: bool,
    pub(crate) auto_build_role_links: bool,
    pub(crate) auto_notify_watcher: bool,
    max_hierarchy_level: usize,
}

impl fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enforcer")
            .field("model", &self.model)
            .field("role_managers", &self.rms.keys().collect::<Vec<_>>())
            .field("functions", &self.functions)
            .field("has_adapter", &self.adapter.is_some())
            .field("has_watcher", &self.watcher.is_some())
            .field("enabled", &self.enabled)
            .field("auto_save", &self.auto_save)
            .field("auto_build_role_links", &self.auto_build_role_links)
            .field("auto_notify_watcher", &self.auto_notify_watcher)
            .finish()
    }
}

impl Enforcer {
    // -- construction ------------------------------------------------------

    /// Enforcer over `model` with no adapter. Rules are added through the
    /// management API.
    pub fn new(model: Model) -> Result<Self> {
        let mut e = Self {
            model,
            functions: builtin_functions(),
            rms: RoleManagers::new(),
            effector: Box::new(DefaultEffector::new()),
            adapter: None,
            watcher: None,
            logger: Box::new(DefaultLogger::new()),
            matchers: MatcherCache::default(),
            enabled: true,
            auto_save: true,
            auto_build_role_links: true,
            auto_notify_watcher: true,
            max_hierarchy_level: DEFAULT_MAX_HIERARCHY_LEVEL,
        };
        e.init_role_managers();
        e.build_role_links()?;
        e.logger.log_model(&e.model);
        Ok(e)
    }

    /// Enforcer over `model` backed by `adapter`. The policy is loaded right
    /// away unless the adapter reports a filtered state.
    pub fn with_adapter(model: Model, adapter: Box<dyn Adapter>) -> Result<Self> {
        let mut e = Self::new(model)?;
        e.adapter = Some(adapter);
        if !e.is_filtered() {
            e.load_policy()?;
        }
        Ok(e)
    }

    /// Enforcer reading the model from `model_path` and the policy from the
    /// text file `policy_path`.
    pub fn from_files(model_path: impl AsRef<Path>, policy_path: impl AsRef<Path>) -> Result<Self> {
        let model = Model::from_file(model_path)?;
        Self::with_adapter(model, Box::new(FileAdapter::new(policy_path.as_ref())))
    }

    /// Apply engine settings: feature flags, logging and hierarchy depth.
    ///
    /// A changed hierarchy depth replaces the default role managers and
    /// rebuilds their links.
    pub fn apply_settings(&mut self, settings: &EngineSettings) -> Result<()> {
        self.enabled = settings.enabled;
        self.auto_save = settings.auto_save;
        self.auto_build_role_links = settings.auto_build_role_links;
        self.auto_notify_watcher = settings.auto_notify_watcher;
        self.logger.enable_log(settings.log_enabled);
        if settings.max_hierarchy_level != self.max_hierarchy_level {
            self.max_hierarchy_level = settings.max_hierarchy_level;
            self.rms.clear();
            self.init_role_managers();
            self.build_role_links()?;
        }
        Ok(())
    }

    /// One role manager per grouping type. Existing managers are cleared and
    /// kept; managers for grouping types the model no longer has are dropped.
    fn init_role_managers(&mut self) {
        let ptypes: Vec<String> = self.model.assertions("g").map(|(k, _)| k.to_string()).collect();
        self.rms.retain(|k, _| ptypes.contains(k));
        for ptype in ptypes {
            match self.rms.get_mut(&ptype) {
                Some(rm) => rm.clear(),
                None => {
                    let rm = DefaultRoleManager::new(self.max_hierarchy_level);
                    self.rms.insert(ptype, Box::new(rm));
                }
            }
        }
    }

    // -- model -------------------------------------------------------------

    /// The current model with its policy tables.
    #[doc(alias = "get_model")]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Send every model definition to the logger.
    pub fn print_model(&self) {
        self.logger.log_model(&self.model);
    }

    /// Replace the model. The policy tables of the new model are used as they
    /// are; call [`load_policy`](Self::load_policy) to fill them from the
    /// adapter.
    pub fn load_model(&mut self, model: Model) -> Result<()> {
        self.model = model;
        self.matchers.clear();
        self.init_role_managers();
        if self.auto_build_role_links {
            self.build_role_links()?;
        }
        self.logger.log_model(&self.model);
        Ok(())
    }

    // -- policy loading ------------------------------------------------------

    /// Reload every rule from the adapter.
    ///
    /// The rules are loaded into a copy of the model; on any failure the
    /// current policy and role links stay as they were. Without an adapter
    /// this is a no-op.
    pub fn load_policy(&mut self) -> Result<()> {
        let Some(adapter) = self.adapter.as_mut() else {
            return Ok(());
        };
        let mut next = self.model.clone();
        next.clear_policy();
        adapter.load_policy(&mut next)?;
        self.swap_policy(next)?;
        tracing::debug!(target: "warden.enforcer", "policy loaded");
        Ok(())
    }

    /// Replace the policy with the subset selected by `filter`.
    ///
    /// # Errors
    ///
    /// [`AdapterError::FilteringUnsupported`] when there is no adapter or it
    /// cannot load filtered subsets.
    pub fn load_filtered_policy(&mut self, filter: &Filter) -> Result<()> {
        let mut next = self.model.clone();
        next.clear_policy();
        self.filtered_adapter_load(&mut next, filter)?;
        self.swap_policy(next)?;
        tracing::debug!(target: "warden.enforcer", ?filter, "filtered policy loaded");
        Ok(())
    }

    /// Append the subset selected by `filter` to the current policy.
    pub fn load_incremental_filtered_policy(&mut self, filter: &Filter) -> Result<()> {
        let mut next = self.model.clone();
        self.filtered_adapter_load(&mut next, filter)?;
        self.swap_policy(next)?;
        tracing::debug!(target: "warden.enforcer", ?filter, "incremental filtered policy loaded");
        Ok(())
    }

    fn filtered_adapter_load(&mut self, model: &mut Model, filter: &Filter) -> Result<()> {
        let filtered = self
            .adapter
            .as_mut()
            .and_then(|a| a.as_filtered())
            .ok_or(AdapterError::FilteringUnsupported)?;
        filtered.load_filtered_policy(model, Some(filter))?;
        Ok(())
    }

    /// Install `next` as the model and rebuild role links from it. On a link
    /// failure the previous links are restored.
    fn swap_policy(&mut self, next: Model) -> Result<()> {
        if self.auto_build_role_links
            && let Err(e) = next.build_role_links(&mut self.rms)
        {
            let _ = self.model.build_role_links(&mut self.rms);
            return Err(e);
        }
        self.model = next;
        self.logger.log_policy(&self.model);
        Ok(())
    }

    /// Whether the loaded policy is a filtered subset.
    pub fn is_filtered(&self) -> bool {
        self.adapter.as_ref().is_some_and(|a| a.is_filtered())
    }

    /// Write every rule through the adapter and notify the watcher.
    ///
    /// # Errors
    ///
    /// [`AdapterError::FilteredSave`] while a filtered subset is loaded.
    pub fn save_policy(&mut self) -> Result<()> {
        if self.is_filtered() {
            return Err(AdapterError::FilteredSave.into());
        }
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.save_policy(&self.model)?;
        }
        if self.auto_notify_watcher
            && let Some(w) = self.watcher.as_mut()
        {
            match w.as_ex() {
                Some(ex) => ex.update_for_save_policy(&self.model)?,
                None => w.update()?,
            }
        }
        Ok(())
    }

    /// Drop every rule and every role link.
    pub fn clear_policy(&mut self) {
        self.model.clear_policy();
        for rm in self.rms.values_mut() {
            rm.clear();
        }
    }

    /// Rebuild every role manager from the grouping rules.
    pub fn build_role_links(&mut self) -> Result<()> {
        self.model.build_role_links(&mut self.rms)?;
        if self.logger.is_enabled() {
            let links: Vec<String> = self
                .rms
                .values()
                .flat_map(|rm| rm.links())
                .map(|l| l.to_string())
                .collect();
            self.logger.log_role(&links);
        }
        Ok(())
    }

    // -- flags ---------------------------------------------------------------

    /// Turn enforcement on or off. While off every request is allowed.
    pub fn enable_enforce(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether enforcement is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn decision and model logging on or off.
    pub fn enable_log(&mut self, enabled: bool) {
        self.logger.enable_log(enabled);
    }

    /// Whether the logger is on.
    pub fn is_log_enabled(&self) -> bool {
        self.logger.is_enabled()
    }

    /// Persist management-API changes through the adapter.
    pub fn enable_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    /// Patch role links on every grouping rule change.
    pub fn enable_auto_build_role_links(&mut self, auto_build: bool) {
        self.auto_build_role_links = auto_build;
    }

    /// Notify the watcher after every successful change.
    pub fn enable_auto_notify_watcher(&mut self, auto_notify: bool) {
        self.auto_notify_watcher = auto_notify;
    }

    // -- collaborators -------------------------------------------------------

    /// Current adapter.
    pub fn adapter(&self) -> Option<&dyn Adapter> {
        self.adapter.as_deref()
    }

    /// Replace the adapter. The policy is not reloaded.
    pub fn set_adapter(&mut self, adapter: Box<dyn Adapter>) {
        self.adapter = Some(adapter);
    }

    /// Replace the watcher. Its update callback is left to the caller.
    pub fn set_watcher(&mut self, watcher: Box<dyn Watcher>) {
        if let Some(mut old) = self.watcher.replace(watcher) {
            old.close();
        }
    }

    /// Current watcher.
    pub fn watcher_mut(&mut self) -> Option<&mut (dyn Watcher + 'static)> {
        self.watcher.as_deref_mut()
    }

    /// Replace the effector.
    pub fn set_effector(&mut self, effector: Box<dyn Effector>) {
        self.effector = effector;
    }

    /// Replace the logger.
    pub fn set_logger(&mut self, logger: Box<dyn Logger>) {
        self.logger = logger;
    }

    /// Role manager of grouping type `g`.
    pub fn role_manager(&self) -> Option<&dyn RoleManager> {
        self.named_role_manager("g")
    }

    /// Role manager of grouping type `ptype`.
    pub fn named_role_manager(&self, ptype: &str) -> Option<&dyn RoleManager> {
        self.rms.get(ptype).map(|rm| rm.as_ref())
    }

    /// Replace the role manager of `g` and rebuild its links.
    pub fn set_role_manager(&mut self, rm: Box<dyn RoleManager>) -> Result<()> {
        self.set_named_role_manager("g", rm)
    }

    /// Replace the role manager of `ptype` and rebuild its links.
    pub fn set_named_role_manager(&mut self, ptype: &str, rm: Box<dyn RoleManager>) -> Result<()> {
        self.rms.insert(ptype.to_string(), rm);
        self.build_role_links()
    }

    // -- functions -----------------------------------------------------------

    /// Register a matcher function.
    pub fn add_function(&mut self, name: &str, function: Function) {
        self.functions.add_function(name, function);
    }

    /// Compare role names of grouping type `ptype` through `f`. Returns
    /// `false` when the model has no such grouping type.
    pub fn add_named_matching_fn(&mut self, ptype: &str, name: &str, f: MatchingFn) -> bool {
        match self.rms.get_mut(ptype) {
            Some(rm) => {
                rm.add_matching_fn(name, f);
                true
            }
            None => false,
        }
    }

    /// Compare domains of grouping type `ptype` through `f`.
    pub fn add_named_domain_matching_fn(&mut self, ptype: &str, name: &str, f: MatchingFn) -> bool {
        match self.rms.get_mut(ptype) {
            Some(rm) => {
                rm.add_domain_matching_fn(name, f);
                true
            }
            None => false,
        }
    }

    // -- persistence plumbing for the management API -------------------------

    /// Fail before touching memory when auto-save is on and the adapter
    /// cannot store single rules.
    pub(crate) fn require_batch(&mut self) -> Result<()> {
        if self.auto_save
            && let Some(adapter) = self.adapter.as_mut()
            && adapter.as_batch().is_none()
        {
            return Err(AdapterError::Unsupported {
                capability: "batch operations",
            }
            .into());
        }
        Ok(())
    }

    /// Like [`require_batch`](Self::require_batch) for in-place updates.
    pub(crate) fn require_updatable(&mut self) -> Result<()> {
        if self.auto_save
            && let Some(adapter) = self.adapter.as_mut()
            && adapter.as_updatable().is_none()
        {
            return Err(AdapterError::Unsupported {
                capability: "policy updates",
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn persist_batch(
        &mut self,
        op: impl FnOnce(&mut dyn BatchAdapter) -> std::result::Result<(), AdapterError>,
    ) -> Result<()> {
        if !self.auto_save {
            return Ok(());
        }
        if let Some(batch) = self.adapter.as_mut().and_then(|a| a.as_batch()) {
            op(batch)?;
        }
        Ok(())
    }

    pub(crate) fn persist_update(
        &mut self,
        op: impl FnOnce(&mut dyn UpdatableAdapter) -> std::result::Result<(), AdapterError>,
    ) -> Result<()> {
        if !self.auto_save {
            return Ok(());
        }
        if let Some(updatable) = self.adapter.as_mut().and_then(|a| a.as_updatable()) {
            op(updatable)?;
        }
        Ok(())
    }

    /// Tell the watcher about a change through the most specific callback.
    pub(crate) fn notify(
        &mut self,
        op: impl FnOnce(&mut dyn WatcherEx) -> std::result::Result<(), WatcherError>,
    ) -> Result<()> {
        if !self.auto_notify_watcher {
            return Ok(());
        }
        let Some(w) = self.watcher.as_mut() else {
            return Ok(());
        };
        match w.as_ex() {
            Some(ex) => op(ex)?,
            None => w.update()?,
        }
        Ok(())
    }
}
