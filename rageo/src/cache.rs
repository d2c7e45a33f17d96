//! Process-lifetime lookup cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// A shared map with exclusive-access discipline.
///
/// Backs the address→coordinates and coordinates→country caches. Unbounded
/// and never evicted: the address space of one run is assumed small
/// relative to the run itself. The lock is scoped to a single
/// check-or-insert; callers perform their network I/O outside of it.
#[derive(Debug, Default)]
pub struct LookupCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> LookupCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Clone the cached value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Insert or replace the value for `key`.
    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().unwrap().insert(key, value);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_insert() {
        let cache: LookupCache<&str, u32> = LookupCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);

        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.len(), 1);

        cache.insert("a", 2);
        assert_eq!(cache.get(&"a"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
