//! Fast hash map and hash set type aliases.
//!
//! Trie children and watcher bookkeeping are keyed by short strings and
//! paths, which is the case the Fx hash is tuned for. None of these maps are
//! exposed to untrusted input, so `DoS` resistance is not needed.
//!
//! # Examples
//!
//! ```
//! use ct_core::{FxHashMap, fx_hash_map};
//!
//! let mut children: FxHashMap<String, usize> = fx_hash_map();
//! children.insert("tools".to_owned(), 2);
//! assert_eq!(children.get("tools"), Some(&2));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_start_empty() {
        let map: FxHashMap<String, u32> = fx_hash_map();
        let set: FxHashSet<String> = fx_hash_set();
        assert!(map.is_empty());
        assert!(set.is_empty());
    }
}
