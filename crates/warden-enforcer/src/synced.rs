// SPDX-License-Identifier: MIT OR Apache-2.0
//! Thread-safe enforcer handle with periodic policy reload.

use crate::Enforcer;
use crate::evaluate::Decision;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use warden_error::Result;
use warden_expr::Value;
use warden_persist::Watcher;

struct AutoLoad {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Cloneable handle sharing one [`Enforcer`] behind a read/write lock.
///
/// Decisions take the read lock, so they run concurrently. Mutations take
/// the write lock. Anything not forwarded here is reachable through
/// [`read`](Self::read) and [`write`](Self::write).
#[derive(Clone)]
pub struct SyncedEnforcer {
    inner: Arc<RwLock<Enforcer>>,
    auto_load: Arc<Mutex<Option<AutoLoad>>>,
}

impl std::fmt::Debug for SyncedEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedEnforcer")
            .field("auto_loading", &self.is_auto_loading_running())
            .finish_non_exhaustive()
    }
}

impl SyncedEnforcer {
    /// Share `enforcer`.
    pub fn new(enforcer: Enforcer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(enforcer)),
            auto_load: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared access.
    pub fn read(&self) -> RwLockReadGuard<'_, Enforcer> {
        self.inner.read()
    }

    /// Exclusive access.
    pub fn write(&self) -> RwLockWriteGuard<'_, Enforcer> {
        self.inner.write()
    }

    // -- decisions ---------------------------------------------------------

    /// See [`Enforcer::enforce`].
    pub fn enforce<I, V>(&self, rvals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.read().enforce(rvals)
    }

    /// See [`Enforcer::enforce_ex`].
    pub fn enforce_ex<I, V>(&self, rvals: I) -> Result<Decision>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.read().enforce_ex(rvals)
    }

    /// See [`Enforcer::batch_enforce`].
    pub fn batch_enforce<B, I, V>(&self, requests: B) -> Result<Vec<bool>>
    where
        B: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.read().batch_enforce(requests)
    }

    // -- policy ------------------------------------------------------------

    /// See [`Enforcer::load_policy`].
    pub fn load_policy(&self) -> Result<()> {
        self.write().load_policy()
    }

    /// See [`Enforcer::save_policy`].
    pub fn save_policy(&self) -> Result<()> {
        self.write().save_policy()
    }

    /// See [`Enforcer::get_policy`].
    pub fn get_policy(&self) -> Vec<Vec<String>> {
        self.read().get_policy()
    }

    /// See [`Enforcer::add_policy`].
    pub fn add_policy<I, S>(&self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().add_policy(rule)
    }

    /// See [`Enforcer::remove_policy`].
    pub fn remove_policy<I, S>(&self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().remove_policy(rule)
    }

    /// See [`Enforcer::add_grouping_policy`].
    pub fn add_grouping_policy<I, S>(&self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().add_grouping_policy(rule)
    }

    /// See [`Enforcer::remove_grouping_policy`].
    pub fn remove_grouping_policy<I, S>(&self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().remove_grouping_policy(rule)
    }

    /// See [`Enforcer::get_roles_for_user`].
    pub fn get_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.read().get_roles_for_user(name, domain)
    }

    /// See [`Enforcer::get_implicit_permissions_for_user`].
    pub fn get_implicit_permissions_for_user(
        &self,
        user: &str,
        domain: Option<&str>,
    ) -> Result<Vec<Vec<String>>> {
        self.read().get_implicit_permissions_for_user(user, domain)
    }

    // -- watcher -----------------------------------------------------------

    /// Install `watcher` with a callback that reloads the policy whenever
    /// another instance reports a change.
    ///
    /// The callback takes the write lock, so the watcher must deliver
    /// notifications from its own thread, never from inside a call made
    /// through this handle.
    pub fn set_watcher(&self, mut watcher: Box<dyn Watcher>) -> Result<()> {
        let weak: Weak<RwLock<Enforcer>> = Arc::downgrade(&self.inner);
        watcher.set_update_callback(Box::new(move |msg| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            tracing::debug!(target: "warden.synced", %msg, "watcher update, reloading policy");
            if let Err(e) = inner.write().load_policy() {
                tracing::warn!(target: "warden.synced", error = %e, "reload after watcher update failed");
            }
        }))?;
        self.write().set_watcher(watcher);
        Ok(())
    }

    // -- auto load ---------------------------------------------------------

    /// Reload the policy every `interval` on the current tokio runtime until
    /// [`stop_auto_load_policy`](Self::stop_auto_load_policy). A running
    /// reload task is replaced. Failed reloads are logged and the previous
    /// policy is kept.
    ///
    /// # Panics
    ///
    /// Outside a tokio runtime.
    pub fn start_auto_load_policy(&self, interval: Duration) {
        let mut slot = self.auto_load.lock();
        if let Some(old) = slot.take() {
            let _ = old.stop.send(true);
        }
        let (stop, mut stopped) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = inner.write().load_policy() {
                            tracing::warn!(target: "warden.synced", error = %e, "auto load failed");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            tracing::debug!(target: "warden.synced", "auto load stopped");
        });
        tracing::debug!(target: "warden.synced", ?interval, "auto load started");
        *slot = Some(AutoLoad { stop, task });
    }

    /// Stop the reload task. No-op when none is running.
    pub fn stop_auto_load_policy(&self) {
        if let Some(auto) = self.auto_load.lock().take() {
            let _ = auto.stop.send(true);
        }
    }

    /// Whether a reload task is running.
    pub fn is_auto_loading_running(&self) -> bool {
        self.auto_load
            .lock()
            .as_ref()
            .is_some_and(|a| !a.task.is_finished())
    }
}

impl From<Enforcer> for SyncedEnforcer {
    fn from(enforcer: Enforcer) -> Self {
        Self::new(enforcer)
    }
}
