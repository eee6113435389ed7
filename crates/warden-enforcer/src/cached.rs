// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Enforcer;
use crate::cache::{Cache, DefaultCache};
use crate::evaluate::{EnforceContext, request_values};
use std::ops::Deref;
use std::path::Path;
use std::time::Duration;
use warden_error::Result;
use warden_expr::Value;

/// Cache key of a request: every field followed by `$$`. Requests with a
/// structured field are not cached.
fn cache_key(rvals: &[Value]) -> Option<String> {
    let mut key = String::new();
    for v in rvals {
        key.push_str(v.as_str()?);
        key.push_str("$$");
    }
    Some(key)
}

/// [`Enforcer`] remembering decisions of all-string requests.
///
/// Reads go through [`Deref`]. Mutations go through
/// [`enforcer_mut`](Self::enforcer_mut) or the removal wrappers here, all of
/// which drop every cached decision.
pub struct CachedEnforcer {
    enforcer: Enforcer,
    cache: Box<dyn Cache>,
    enabled: bool,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for CachedEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedEnforcer")
            .field("enforcer", &self.enforcer)
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CachedEnforcer {
    /// Wrap `enforcer` with an empty [`DefaultCache`]. Caching starts enabled.
    pub fn new(enforcer: Enforcer) -> Self {
        Self {
            enforcer,
            cache: Box::new(DefaultCache::new()),
            enabled: true,
            ttl: None,
        }
    }

    /// Cached enforcer over a model file and a policy file.
    pub fn from_files(model_path: impl AsRef<Path>, policy_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Enforcer::from_files(model_path, policy_path)?))
    }

    /// Replace the decision store.
    pub fn set_cache(&mut self, cache: Box<dyn Cache>) {
        self.cache = cache;
    }

    /// Lifetime of new entries. `None` keeps them until invalidated.
    pub fn set_expire_time(&mut self, ttl: Option<Duration>) {
        self.ttl = ttl;
    }

    /// Turn caching on or off. Turning it off does not clear the store.
    pub fn enable_cache(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Drop every cached decision.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Decide `rvals`, answering from the cache when possible.
    pub fn enforce<I, V>(&self, rvals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rvals = request_values(rvals);
        let key = if self.enabled { cache_key(&rvals) } else { None };
        if let Some(key) = &key
            && let Some(allowed) = self.cache.get(key)
        {
            return Ok(allowed);
        }
        let allowed = self
            .enforcer
            .enforce_values(&EnforceContext::default(), None, &rvals)?
            .allowed;
        if let Some(key) = key {
            self.cache.set(&key, allowed, self.ttl);
        }
        Ok(allowed)
    }

    /// Mutable access to the wrapped enforcer. Drops every cached decision.
    pub fn enforcer_mut(&mut self) -> &mut Enforcer {
        self.cache.clear();
        &mut self.enforcer
    }

    /// Unwrap.
    pub fn into_inner(self) -> Enforcer {
        self.enforcer
    }

    /// Reload the policy and drop every cached decision.
    pub fn load_policy(&mut self) -> Result<()> {
        self.cache.clear();
        self.enforcer.load_policy()
    }

    /// Remove a `p` rule. A rule can decide requests other than its own
    /// fields through roles or patterns, so every cached decision is dropped.
    pub fn remove_policy<I, S>(&mut self, rule: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache.clear();
        self.enforcer.remove_policy(rule)
    }

    /// Remove `p` rules and drop every cached decision.
    pub fn remove_policies(&mut self, rules: &[Vec<String>]) -> Result<bool> {
        self.cache.clear();
        self.enforcer.remove_policies(rules)
    }
}

impl Deref for CachedEnforcer {
    type Target = Enforcer;

    fn deref(&self) -> &Enforcer {
        &self.enforcer
    }
}
