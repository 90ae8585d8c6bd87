//! The table of tracked heartbeat sources.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::metrics::AppMetrics;
use crate::models::TrackedInstance;

/// Mapping from instance key to tracked state.
///
/// The reconciler is the only writer, with one exception: the modify surface
/// performs a single-key delete through [`remove`](Registry::remove). The
/// status surface reads through [`snapshot`](Registry::snapshot). A poisoned
/// lock means a writer panicked mid-update; the process is not expected to
/// survive that (the health probe stops answering and the supervisor
/// restarts it).
pub struct Registry {
    entries: RwLock<HashMap<String, TrackedInstance>>,
    metrics: Arc<AppMetrics>,
}

impl Registry {
    /// Creates an empty registry reporting its cardinality to `metrics`.
    pub fn new(metrics: Arc<AppMetrics>) -> Self {
        Registry { entries: RwLock::new(HashMap::new()), metrics }
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, TrackedInstance>> {
        self.entries.write().expect("registry lock poisoned")
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<String, TrackedInstance>> {
        self.entries.read().expect("registry lock poisoned")
    }

    /// Re-syncs the instance gauge; callers pass the map length they
    /// observed under the lock.
    pub(crate) fn sync_gauge(&self, len: usize) {
        self.metrics.monitored_instances.set(len as i64);
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// A point-in-time copy of every entry, sorted by key for stable
    /// display.
    pub fn snapshot(&self) -> Vec<(String, TrackedInstance)> {
        let mut entries: Vec<_> =
            self.read().iter().map(|(key, instance)| (key.clone(), instance.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Removes one entry by key; returns whether it existed. This is the
    /// modify surface's delete.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.write();
        let removed = entries.remove(key).is_some();
        let len = entries.len();
        drop(entries);
        if removed {
            self.sync_gauge(len);
        }
        removed
    }
}
