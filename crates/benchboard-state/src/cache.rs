use std::collections::HashMap;
use std::hash::Hash;

/// Append-only map shared for a whole dataset version.
/// Entries are never replaced or evicted; `clear` drops everything at once.
#[derive(Debug, Clone)]
pub struct SessionCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for SessionCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> SessionCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Keeps the first value stored under `key`.
    pub fn insert(&mut self, key: K, value: V) -> &V {
        self.entries.entry(key).or_insert(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
