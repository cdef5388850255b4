//! A small bounded least-recently-used map.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Bounded map that evicts the least recently used entry when full.
///
/// Every `get` and `insert` stamps the entry with a fresh tick. `order`
/// maps ticks back to keys so the oldest entry is the first one in it.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// A cache holding at most `capacity` entries. A capacity of zero is
    /// treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up `key` and mark it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick();
        let (value, stamp) = self.entries.get_mut(key)?;
        if let Some(k) = self.order.remove(&*stamp) {
            self.order.insert(tick, k);
        }
        *stamp = tick;
        Some(&*value)
    }

    /// Look up `key` without touching its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|(v, _)| v)
    }

    /// Insert or replace `key`. Returns the entry evicted to make room, if
    /// any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();
        if let Some((old, stamp)) = self.entries.get_mut(&key) {
            *old = value;
            self.order.remove(&*stamp);
            *stamp = tick;
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_oldest()
        } else {
            None
        };
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
        evicted
    }

    /// Remove `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (value, stamp) = self.entries.remove(key)?;
        self.order.remove(&stamp);
        Some(value)
    }

    /// Remove every entry for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        let order = &mut self.order;
        self.entries.retain(|k, (v, stamp)| {
            let kept = keep(k, &*v);
            if !kept {
                order.remove(&*stamp);
            }
            kept
        });
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn pop_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let (value, _) = self.entries.remove(&key)?;
        Some((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get("a"), Some(&1));
        let evicted = cache.insert("c", 3);
        assert_eq!(evicted, Some(("b", 2)));
        assert!(cache.peek("a").is_some());
        assert!(cache.peek("b").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn replacing_does_not_evict() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.peek("a"), Some(&10));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn peek_keeps_order() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.peek("a");
        assert_eq!(cache.insert("c", 3), Some(("a", 1)));
    }

    #[test]
    fn remove_and_retain() {
        let mut cache = LruCache::new(4);
        for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
            cache.insert(k, v);
        }
        assert_eq!(cache.remove("b"), Some(2));
        cache.retain(|_, v| *v > 1);
        assert_eq!(cache.len(), 1);
        cache.insert("d", 4);
        cache.insert("e", 5);
        cache.insert("f", 6);
        assert_eq!(cache.insert("g", 7), Some(("c", 3)));
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut cache = LruCache::new(0);
        cache.insert(1, "x");
        cache.insert(2, "y");
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&2), Some(&"y"));
    }
}
