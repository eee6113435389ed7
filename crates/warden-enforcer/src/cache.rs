// SPDX-License-Identifier: MIT OR Apache-2.0

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Decision store used by [`CachedEnforcer`](crate::CachedEnforcer).
pub trait Cache: Send + Sync {
    /// Store `allowed` under `key`, expiring after `ttl` when given.
    fn set(&self, key: &str, allowed: bool, ttl: Option<Duration>);

    /// Stored decision, `None` when absent or expired.
    fn get(&self, key: &str) -> Option<bool>;

    /// Forget `key`.
    fn delete(&self, key: &str);

    /// Forget everything.
    fn clear(&self);
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    allowed: bool,
    expires_at: Option<Instant>,
}

/// In-memory [`Cache`] with per-entry expiry.
#[derive(Debug, Default)]
pub struct DefaultCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl DefaultCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for DefaultCache {
    fn set(&self, key: &str, allowed: bool, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .insert(key.to_string(), Entry { allowed, expires_at });
    }

    fn get(&self, key: &str) -> Option<bool> {
        let mut entries = self.entries.lock();
        let entry = *entries.get(key)?;
        if entry.expires_at.is_some_and(|t| Instant::now() >= t) {
            entries.remove(key);
            return None;
        }
        Some(entry.allowed)
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}
