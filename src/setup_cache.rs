//! Process-wide record of one-time administrative setup
//!
//! Some backend setup (merging iterators, locality groups) must run at most
//! once per (adapter, index) pair for the life of the process, however many
//! writers target that index concurrently. `add_if_absent` is the single
//! point where that is decided: the caller that gets `true` performs the
//! setup, everyone else skips it.
//!
//! Entries are never removed when the setup itself fails; a failed setup
//! is not retried for the rest of the process.
//!
//! Caches are namespaced so unrelated kinds of setup never share entries.
//! The registry is passed to writers explicitly (see `StoreServices`).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::ByteArrayId;

/// Namespace for row-merging iterator attachment
pub const ROW_MERGING_CACHE_ID: &str = "ROW_MERGING_ADAPTER";

/// Namespace for locality group creation
pub const LOCALITY_GROUP_CACHE_ID: &str = "LOCALITY_GROUP";

/// Recovers the guard on poison: the set stays consistent because every
/// critical section is a single insert or lookup.
fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Set of (adapter id, index name) pairs whose setup has been claimed
#[derive(Debug, Default)]
pub struct SetupCache {
    entries: Mutex<HashSet<(ByteArrayId, String)>>,
}

impl SetupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the pair. True only for the first caller.
    pub fn add_if_absent(&self, adapter_id: &ByteArrayId, index_name: &str) -> bool {
        lock_recover(&self.entries).insert((adapter_id.clone(), index_name.to_string()))
    }

    pub fn contains(&self, adapter_id: &ByteArrayId, index_name: &str) -> bool {
        lock_recover(&self.entries).contains(&(adapter_id.clone(), index_name.to_string()))
    }

    pub fn len(&self) -> usize {
        lock_recover(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock_recover(&self.entries).is_empty()
    }

    /// Forget every claim
    pub fn clear(&self) {
        lock_recover(&self.entries).clear();
    }
}

/// Namespaced setup caches shared by every writer in the process
#[derive(Debug, Default)]
pub struct SetupCacheRegistry {
    caches: Mutex<HashMap<String, Arc<SetupCache>>>,
}

impl SetupCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for `namespace`, created on first access
    pub fn cache(&self, namespace: &str) -> Arc<SetupCache> {
        let mut caches = lock_recover(&self.caches);
        Arc::clone(caches.entry(namespace.to_string()).or_default())
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<_> = lock_recover(&self.caches).keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_add_if_absent_first_wins() {
        let cache = SetupCache::new();
        let adapter = ByteArrayId::from_str("roads");

        assert!(cache.add_if_absent(&adapter, "idx"));
        assert!(!cache.add_if_absent(&adapter, "idx"));
        assert!(cache.add_if_absent(&adapter, "other_idx"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let registry = SetupCacheRegistry::new();
        let adapter = ByteArrayId::from_str("roads");

        assert!(registry.cache(ROW_MERGING_CACHE_ID).add_if_absent(&adapter, "idx"));
        assert!(registry.cache(LOCALITY_GROUP_CACHE_ID).add_if_absent(&adapter, "idx"));
        assert!(!registry.cache(ROW_MERGING_CACHE_ID).add_if_absent(&adapter, "idx"));
        assert_eq!(registry.namespaces().len(), 2);
    }

    #[test]
    fn test_same_namespace_returns_same_cache() {
        let registry = SetupCacheRegistry::new();
        let a = registry.cache("ns");
        let b = registry.cache("ns");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let registry = Arc::new(SetupCacheRegistry::new());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry
                        .cache(ROW_MERGING_CACHE_ID)
                        .add_if_absent(&ByteArrayId::from_str("roads"), "idx")
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
