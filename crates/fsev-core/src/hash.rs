//! Fast hash map and hash set type aliases.
//!
//! Type aliases for [`FxHashMap`] and [`FxHashSet`] from the `rustc-hash`
//! crate, used for the internal path-keyed tables (the notifier watch list,
//! the write-suppression table). The Fx algorithm is faster than the
//! standard hasher for string-like keys and these tables are never exposed
//! to untrusted key material.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_operations() {
        let mut map: FxHashMap<&str, i32> = FxHashMap::default();
        map.insert("/tmp/a", 1);
        map.insert("/tmp/b", 2);
        assert_eq!(map.get("/tmp/a"), Some(&1));
        assert_eq!(map.get("/tmp/c"), None);
    }

    #[test]
    fn test_fx_hash_set_operations() {
        let mut set: FxHashSet<&str> = FxHashSet::default();
        set.insert("/tmp/a");
        assert!(set.contains("/tmp/a"));
        assert!(!set.contains("/tmp/b"));
    }
}
